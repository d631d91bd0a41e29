//! Scripted collaborators for exercising the venue without external systems.
//!
//! Unlike a canned stub, each mock keeps enough state (submitted orders,
//! deployment calls, in-flight counters) for tests to assert on what the
//! core actually did.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use venue_models::market::Market;
use venue_models::metrics::MetricsSnapshot;
use venue_models::prediction::AgentPrediction;
use venue_models::trade::{Fill, TradeRecord};
use venue_store::{RecordSink, StoreError};

use crate::collaborators::{AgentPool, ExecutionBackend, OrderRequest, PredictionSource, PriceFeed};
use crate::error::VenueError;

/// Price feed with settable prices and per-asset failures.
#[derive(Default)]
pub struct ScriptedPriceFeed {
    prices: Mutex<HashMap<String, Decimal>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, asset: &str, price: Decimal) -> Self {
        self.set_price(asset, price);
        self
    }

    pub fn set_price(&self, asset: &str, price: Decimal) {
        if let Ok(mut prices) = self.prices.lock() {
            prices.insert(asset.to_string(), price);
        }
    }

    /// Make lookups for `asset` fail (or succeed again).
    pub fn set_failing(&self, asset: &str, failing: bool) {
        if let Ok(mut set) = self.failing.lock() {
            if failing {
                set.insert(asset.to_string());
            } else {
                set.remove(asset);
            }
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFeed for ScriptedPriceFeed {
    async fn price(&self, asset: &str) -> Result<Decimal, VenueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing
            .lock()
            .map(|set| set.contains(asset))
            .unwrap_or(true);
        if failing {
            return Err(VenueError::PriceFeed(format!("feed down for {asset}")));
        }
        self.prices
            .lock()
            .ok()
            .and_then(|prices| prices.get(asset).copied())
            .ok_or_else(|| VenueError::PriceFeed(format!("no quote for {asset}")))
    }
}

/// Execution backend that fills at a scripted price and can reject pairs.
pub struct MockBackend {
    prices: HashMap<String, Decimal>,
    default_price: Decimal,
    capital: Decimal,
    rejected_pairs: HashSet<String>,
    delay: Duration,
    submitted: Mutex<Vec<OrderRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            default_price: Decimal::ONE_HUNDRED,
            capital: Decimal::new(100_000, 0),
            rejected_pairs: HashSet::new(),
            delay: Duration::ZERO,
            submitted: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_fill_price(mut self, pair: &str, price: Decimal) -> Self {
        self.prices.insert(pair.to_string(), price);
        self
    }

    pub fn rejecting(mut self, pair: &str) -> Self {
        self.rejected_pairs.insert(pair.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted
            .lock()
            .map(|orders| orders.clone())
            .unwrap_or_default()
    }

    /// Highest number of submissions that were in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    async fn submit(&self, order: &OrderRequest) -> Result<Fill, VenueError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Ok(mut orders) = self.submitted.lock() {
            orders.push(order.clone());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.rejected_pairs.contains(&order.pair) {
            return Err(VenueError::Backend(format!(
                "order rejected for {}",
                order.pair
            )));
        }

        let price = self
            .prices
            .get(&order.pair)
            .copied()
            .unwrap_or(self.default_price);
        Ok(Fill {
            trade_id: format!("mock-{}", order.signal_id),
            price,
            volume: order.size * self.capital,
        })
    }
}

/// One scripted agent opinion, stamped with the market id when served.
#[derive(Debug, Clone)]
pub struct ScriptedPrediction {
    pub agent_id: String,
    pub signal_strength: Decimal,
    pub confidence: Decimal,
    pub reputation_weight: Option<Decimal>,
}

impl ScriptedPrediction {
    pub fn new(agent_id: &str, signal: Decimal, confidence: Decimal, weight: Decimal) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            signal_strength: signal,
            confidence,
            reputation_weight: Some(weight),
        }
    }
}

/// Prediction source keyed by asset.
#[derive(Default)]
pub struct MockPredictionSource {
    by_asset: Mutex<HashMap<String, Vec<ScriptedPrediction>>>,
    failing: AtomicBool,
}

impl MockPredictionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predictions(self, asset: &str, predictions: Vec<ScriptedPrediction>) -> Self {
        self.set_predictions(asset, predictions);
        self
    }

    pub fn set_predictions(&self, asset: &str, predictions: Vec<ScriptedPrediction>) {
        if let Ok(mut map) = self.by_asset.lock() {
            map.insert(asset.to_string(), predictions);
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PredictionSource for MockPredictionSource {
    async fn predictions(&self, market: &Market) -> Result<Vec<AgentPrediction>, VenueError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(VenueError::Predictions("prediction store offline".to_string()));
        }
        let scripted = self
            .by_asset
            .lock()
            .ok()
            .and_then(|map| map.get(&market.asset).cloned())
            .unwrap_or_default();
        Ok(scripted
            .into_iter()
            .map(|p| AgentPrediction {
                agent_id: p.agent_id,
                market_id: market.id.clone(),
                signal_strength: p.signal_strength,
                confidence: p.confidence,
                reputation_weight: p.reputation_weight,
            })
            .collect())
    }
}

/// Agent pool drawing from a fixed list of agent ids.
pub struct MockAgentPool {
    agents: Vec<String>,
    failing: AtomicBool,
    deploy_calls: AtomicUsize,
    trigger_calls: AtomicUsize,
}

impl MockAgentPool {
    pub fn new(agents: &[&str]) -> Self {
        Self {
            agents: agents.iter().map(|a| a.to_string()).collect(),
            failing: AtomicBool::new(false),
            deploy_calls: AtomicUsize::new(0),
            trigger_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn deploy_calls(&self) -> usize {
        self.deploy_calls.load(Ordering::SeqCst)
    }

    pub fn trigger_calls(&self) -> usize {
        self.trigger_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentPool for MockAgentPool {
    async fn deploy(&self, market: &Market, count: usize) -> Result<Vec<String>, VenueError> {
        self.deploy_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(VenueError::AgentPool("agent deployment failed".to_string()));
        }
        Ok(self
            .agents
            .iter()
            .filter(|a| !market.has_participant(a))
            .take(count)
            .cloned()
            .collect())
    }

    async fn trigger_predictions(&self, _market: &Market) -> Result<(), VenueError> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(VenueError::AgentPool("prediction trigger failed".to_string()));
        }
        Ok(())
    }
}

/// Sink that keeps every snapshot it was handed, optionally failing each write.
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<MetricsSnapshot>>,
    trade_batches: Mutex<Vec<usize>>,
    failing: bool,
    incremental: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Ask for changed trades only, like the SQLite journal.
    pub fn incremental() -> Self {
        Self {
            incremental: true,
            ..Self::default()
        }
    }

    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.snapshots
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Number of records handed over by each `write_trades` call.
    pub fn trade_batches(&self) -> Vec<usize> {
        self.trade_batches
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

impl RecordSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn write_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push(snapshot.clone());
        }
        Ok(())
    }

    fn wants_full_ledger(&self) -> bool {
        !self.incremental
    }

    fn write_trades(&self, trades: &[TradeRecord]) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        if let Ok(mut batches) = self.trade_batches.lock() {
            batches.push(trades.len());
        }
        Ok(())
    }
}
