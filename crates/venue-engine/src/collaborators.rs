//! Capability contracts for everything the venue core does not own.
//!
//! Each trait is the narrow boundary to an external system. Implementations
//! must be cheap to share (`Send + Sync`) because the orchestrator fans calls
//! out across markets and signals.

use async_trait::async_trait;
use rust_decimal::Decimal;
use venue_models::market::Market;
use venue_models::prediction::AgentPrediction;
use venue_models::signal::{Direction, TradingSignal};
use venue_models::trade::Fill;

use crate::error::VenueError;

/// Spot price source. May fail or hang; callers go through `PriceOracle`,
/// which applies a timeout and falls back to last-known prices.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Current price of `asset` in quote currency. Must be positive on success.
    async fn price(&self, asset: &str) -> Result<Decimal, VenueError>;
}

/// Parameters for a single order submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub signal_id: String,
    pub asset: String,
    pub pair: String,
    pub direction: Direction,
    /// Fraction of capital.
    pub size: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl OrderRequest {
    /// Build an order from a risk-approved signal. `None` if the signal has
    /// not been through the risk assessor.
    pub fn from_signal(signal: &TradingSignal) -> Option<Self> {
        Some(Self {
            signal_id: signal.id.clone(),
            asset: signal.asset.clone(),
            pair: signal.pair.clone(),
            direction: signal.direction,
            size: signal.size,
            stop_loss: signal.stop_loss?,
            take_profit: signal.take_profit?,
        })
    }
}

/// Order execution backend.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Place one order. A returned error means nothing was filled.
    async fn submit(&self, order: &OrderRequest) -> Result<Fill, VenueError>;
}

/// Where agent predictions come from.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    /// Current predictions for `market`. An empty list is a valid answer
    /// (the market simply yields no consensus). An error means the source
    /// could not be read at all.
    async fn predictions(&self, market: &Market) -> Result<Vec<AgentPrediction>, VenueError>;
}

/// Deploys prediction agents onto markets.
#[async_trait]
pub trait AgentPool: Send + Sync {
    /// Assign up to `count` agents not already participating in `market`.
    /// Returns the ids actually assigned, which may be fewer than requested.
    async fn deploy(&self, market: &Market, count: usize) -> Result<Vec<String>, VenueError>;

    /// Ask the market's participants to produce fresh predictions.
    async fn trigger_predictions(&self, market: &Market) -> Result<(), VenueError>;
}
