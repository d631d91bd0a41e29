use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running performance counters. Monotonic; only an operator reset clears them.
///
/// Decimal fields are written as JSON numbers so dashboards can plot them directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PerformanceMetrics {
    pub total_signals: u64,
    pub executed_trades: u64,
    pub profitable_trades: u64,
    pub closed_trades: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_pnl: Decimal,
    /// executed_trades / total_signals, 0 when no signals were seen.
    #[serde(with = "rust_decimal::serde::float")]
    pub accuracy_rate: Decimal,
    /// Mean hold time of closed trades, in hours.
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_hold_time: Decimal,
}

impl PerformanceMetrics {
    pub fn refresh_accuracy(&mut self) {
        self.accuracy_rate = if self.total_signals == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.executed_trades) / Decimal::from(self.total_signals)
        };
    }

    /// Fold one closed trade's hold time into the running mean.
    pub fn record_close(&mut self, hold_hours: Decimal, realized_pnl: Decimal) {
        let previous = Decimal::from(self.closed_trades);
        self.closed_trades += 1;
        self.avg_hold_time =
            (self.avg_hold_time * previous + hold_hours) / Decimal::from(self.closed_trades);
        self.total_pnl += realized_pnl;
        if realized_pnl > Decimal::ZERO {
            self.profitable_trades += 1;
        }
    }
}

/// Flat record written to sinks at the end of every cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
    pub active_trades: usize,
    pub active_markets: usize,
    pub total_markets_created: u64,
    pub total_predictions: u64,
    pub expired_signals: u64,
    pub cycle: u64,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accuracy_guarded_against_zero_signals() {
        let mut metrics = PerformanceMetrics::default();
        metrics.refresh_accuracy();
        assert_eq!(metrics.accuracy_rate, Decimal::ZERO);

        metrics.total_signals = 4;
        metrics.executed_trades = 3;
        metrics.refresh_accuracy();
        assert_eq!(metrics.accuracy_rate, dec!(0.75));
    }

    #[test]
    fn running_hold_time_average() {
        let mut metrics = PerformanceMetrics::default();
        metrics.record_close(dec!(2), dec!(15));
        metrics.record_close(dec!(4), dec!(-5));
        assert_eq!(metrics.closed_trades, 2);
        assert_eq!(metrics.avg_hold_time, dec!(3));
        assert_eq!(metrics.total_pnl, dec!(10));
        assert_eq!(metrics.profitable_trades, 1);
    }

    #[test]
    fn snapshot_is_flat_json() {
        let snapshot = MetricsSnapshot {
            metrics: PerformanceMetrics {
                total_signals: 2,
                executed_trades: 1,
                total_pnl: dec!(12.5),
                accuracy_rate: dec!(0.5),
                ..Default::default()
            },
            active_trades: 1,
            active_markets: 3,
            total_markets_created: 3,
            total_predictions: 9,
            expired_signals: 0,
            cycle: 1,
            last_updated: Utc::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["total_signals"], 2);
        assert_eq!(json["executed_trades"], 1);
        assert_eq!(json["profitable_trades"], 0);
        assert_eq!(json["total_pnl"], 12.5);
        assert_eq!(json["accuracy_rate"], 0.5);
        assert_eq!(json["active_markets"], 3);
    }
}
