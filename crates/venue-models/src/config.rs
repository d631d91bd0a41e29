use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::MarketType;

/// Top-level configuration for the venue.
///
/// Every section and field has a default, so a partial (or empty) TOML file
/// is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VenueConfig {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub markets: MarketsConfig,
    #[serde(default)]
    pub prices: PricesConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub paper: PaperConfig,
}

impl VenueConfig {
    /// Risk section with the size limit resolved against the sizing cap.
    pub fn effective_risk(&self) -> RiskConfig {
        RiskConfig {
            max_position_size: Some(
                self.risk
                    .max_position_size
                    .unwrap_or(self.trading.max_position_size),
            ),
            ..self.risk.clone()
        }
    }
}

/// Signal generation and sizing parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradingConfig {
    /// Minimum consensus confidence (inclusive) before a signal is created.
    pub execution_threshold: Decimal,
    /// Per-trade size cap as a fraction of capital. The floor is 25% of this.
    pub max_position_size: Decimal,
    /// How long a generated signal stays executable.
    pub signal_ttl_hours: i64,
    /// Quote currency used to build trading pairs (`BTC` -> `BTC-USDT`).
    pub quote_currency: String,
    /// Explicit asset -> trading pair overrides.
    pub pairs: HashMap<String, String>,
}

impl TradingConfig {
    /// Smallest size a signal can carry.
    pub fn min_position_size(&self) -> Decimal {
        self.max_position_size * Decimal::new(25, 2)
    }

    /// Trading pair for an asset, honouring overrides.
    pub fn pair_for(&self, asset: &str) -> String {
        let asset = asset.to_uppercase();
        self.pairs
            .get(&asset)
            .cloned()
            .unwrap_or_else(|| format!("{asset}-{}", self.quote_currency))
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            execution_threshold: Decimal::new(70, 2),
            max_position_size: Decimal::new(25, 3),
            signal_ttl_hours: 24,
            quote_currency: "USDT".to_string(),
            pairs: HashMap::new(),
        }
    }
}

/// Agent participation rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    /// Markets with fewer participants never produce a consensus.
    pub min_agents_per_market: usize,
    pub max_agents_per_market: usize,
    /// Weight applied to predictions that arrive without a reputation weight.
    pub default_reputation_weight: Decimal,
    /// Agent identifiers available for deployment.
    pub pool: Vec<String>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            min_agents_per_market: 3,
            max_agents_per_market: 10,
            default_reputation_weight: Decimal::ONE,
            pool: Vec::new(),
        }
    }
}

/// Fixed risk parameters applied by the risk assessor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Stop-loss distance as a fraction of entry.
    pub stop_loss: Decimal,
    /// Take-profit distance as a fraction of entry.
    pub take_profit: Decimal,
    /// Maximum concurrently open positions per asset.
    pub max_positions: usize,
    /// Hard limit on a single signal's size fraction. Unset means the
    /// `[trading]` sizing cap applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_position_size: Option<Decimal>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss: Decimal::new(15, 3),
            take_profit: Decimal::new(3, 2),
            max_positions: 5,
            max_position_size: None,
        }
    }
}

/// Cycle scheduling and fan-out limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CycleConfig {
    /// Sleep between successful cycles.
    pub cycle_interval_seconds: u64,
    /// Sleep after a failed cycle.
    pub error_backoff_seconds: u64,
    /// Concurrent submissions to the execution backend.
    pub max_concurrent_executions: usize,
    /// Concurrent prediction fetches during aggregation.
    pub max_concurrent_markets: usize,
    /// Per-call timeout for the price feed.
    pub price_timeout_seconds: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_interval_seconds: 1800,
            error_backoff_seconds: 60,
            max_concurrent_executions: 4,
            max_concurrent_markets: 8,
            price_timeout_seconds: 10,
        }
    }
}

/// Automatic market creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketsConfig {
    pub auto_create_interval_hours: i64,
    pub max_active_markets: usize,
    /// One market of each listed type is created per creation round.
    pub market_types: Vec<MarketType>,
    /// Assets rotated through when creating markets.
    pub assets: Vec<String>,
    pub market_lifetime_days: i64,
    /// Price-target markets ask whether price ends above `current * multiplier`.
    pub price_target_multiplier: Decimal,
}

impl Default for MarketsConfig {
    fn default() -> Self {
        Self {
            auto_create_interval_hours: 6,
            max_active_markets: 20,
            market_types: vec![
                MarketType::PriceTarget,
                MarketType::PerformanceThreshold,
                MarketType::Trend,
            ],
            assets: ["BTC", "ETH", "SOL", "ARB", "AVAX"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            market_lifetime_days: 30,
            price_target_multiplier: Decimal::new(115, 2),
        }
    }
}

/// Price fallback behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricesConfig {
    /// Used when neither the feed nor the last-known cache has a price.
    pub default_prices: HashMap<String, Decimal>,
    pub last_known_ttl_seconds: u64,
    pub last_known_capacity: u64,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            default_prices: HashMap::new(),
            last_known_ttl_seconds: 86_400,
            last_known_capacity: 1024,
        }
    }
}

/// Where metrics and the trade ledger are written. Unset paths disable that sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    pub metrics_path: Option<String>,
    pub signals_path: Option<String>,
    pub sqlite_path: Option<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            metrics_path: Some("output/prediction_trading_performance.json".to_string()),
            signals_path: None,
            sqlite_path: None,
        }
    }
}

/// Settings for the paper collaborators wired by the `venue` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaperConfig {
    /// JSON file of per-asset agent predictions, re-read every cycle.
    pub predictions_path: String,
    /// Capital that size fractions are applied to when computing notional.
    pub capital: Decimal,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            predictions_path: "config/predictions.json".to_string(),
            capital: Decimal::new(100_000, 0),
        }
    }
}
