pub mod config;
pub mod market;
pub mod metrics;
pub mod prediction;
pub mod risk;
pub mod signal;
pub mod trade;

pub use config::{
    AgentsConfig, CycleConfig, MarketsConfig, PaperConfig, PersistenceConfig, PricesConfig, RiskConfig,
    TradingConfig, VenueConfig,
};
pub use market::{Market, MarketType};
pub use metrics::{MetricsSnapshot, PerformanceMetrics};
pub use prediction::{AgentPrediction, MarketConsensus};
pub use risk::RiskDecision;
pub use signal::{Direction, TradingSignal};
pub use trade::{ExecutionOutcome, ExecutionReport, Fill, Rejection, TradeRecord, TradeStatus};
