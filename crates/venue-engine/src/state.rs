use chrono::{DateTime, Utc};
use venue_models::metrics::MetricsSnapshot;
use venue_models::prediction::MarketConsensus;

use crate::markets::MarketBook;
use crate::performance::PerformanceTracker;

/// Everything the venue carries between cycles.
///
/// Owned by the orchestrator and only touched by the cycle in flight.
#[derive(Debug, Default)]
pub struct VenueState {
    pub cycle: u64,
    pub markets: MarketBook,
    pub tracker: PerformanceTracker,
    /// Signals that expired before they could be executed.
    pub expired_signals: u64,
    /// Consensus from the latest aggregation.
    pub consensus: Vec<MarketConsensus>,
    pub total_predictions: u64,
}

impl VenueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> MetricsSnapshot {
        MetricsSnapshot {
            metrics: self.tracker.metrics().clone(),
            active_trades: self.tracker.open_trades().count(),
            active_markets: self.markets.len(),
            total_markets_created: self.markets.total_created(),
            total_predictions: self.total_predictions,
            expired_signals: self.expired_signals,
            cycle: self.cycle,
            last_updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_snapshot() {
        let now = Utc::now();
        let snapshot = VenueState::new().snapshot(now);
        assert_eq!(snapshot.cycle, 0);
        assert_eq!(snapshot.active_trades, 0);
        assert_eq!(snapshot.active_markets, 0);
        assert_eq!(snapshot.metrics.total_signals, 0);
        assert_eq!(snapshot.expired_signals, 0);
        assert_eq!(snapshot.last_updated, now);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["accuracy_rate"], serde_json::json!(0.0));
        assert_eq!(json["total_markets_created"], serde_json::json!(0));
    }
}
