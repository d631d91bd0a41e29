pub mod collaborators;
pub mod consensus;
pub mod error;
pub mod execution;
pub mod markets;
pub mod orchestrator;
pub mod performance;
pub mod pricing;
pub mod risk;
pub mod signals;
pub mod state;

pub mod test_support;

pub use collaborators::{AgentPool, ExecutionBackend, OrderRequest, PredictionSource, PriceFeed};
pub use consensus::{ConsensusAggregator, PredictionSnapshot};
pub use error::VenueError;
pub use execution::ExecutionBridge;
pub use markets::MarketBook;
pub use orchestrator::{Collaborators, CyclePhase, CycleReport, Orchestrator};
pub use performance::{MonitorSummary, PerformanceTracker};
pub use pricing::PriceOracle;
pub use risk::{Exposure, RiskAssessor};
pub use signals::SignalGenerator;
pub use state::VenueState;
