use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use venue_models::metrics::PerformanceMetrics;
use venue_models::trade::{ExecutionReport, TradeRecord, TradeStatus};

use crate::pricing::PriceOracle;
use crate::risk::Exposure;

/// What one monitoring pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorSummary {
    pub updated: usize,
    pub closed_profit: usize,
    pub closed_loss: usize,
    /// Open trades left untouched because no price was available.
    pub unpriced: usize,
}

/// Running counters plus the trade ledger.
///
/// Mutated only by the execution bridge (`record`) and by monitoring, both
/// driven from the single in-flight cycle.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    metrics: PerformanceMetrics,
    trades: Vec<TradeRecord>,
    /// Ledger indices touched since the last `take_changed`.
    changed: BTreeSet<usize>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// Every trade record ever produced, open or archived.
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades.iter().filter(|t| t.is_open())
    }

    pub fn exposure(&self) -> Exposure {
        self.open_trades().map(|t| t.signal.asset.as_str()).collect()
    }

    /// Records created, re-priced or closed since the previous call.
    pub fn take_changed(&mut self) -> Vec<TradeRecord> {
        std::mem::take(&mut self.changed)
            .into_iter()
            .filter_map(|index| self.trades.get(index).cloned())
            .collect()
    }

    /// Fold an execution batch into the running totals and the ledger.
    pub fn record(&mut self, report: &ExecutionReport) {
        self.metrics.total_signals += report.signals_seen() as u64;
        self.metrics.executed_trades += report.successful as u64;
        self.metrics.refresh_accuracy();
        let start = self.trades.len();
        self.trades.extend(report.trades.iter().cloned());
        self.changed.extend(start..self.trades.len());
    }

    /// Re-price every open trade, closing those that crossed their stop-loss
    /// or take-profit.
    pub async fn monitor_open_trades(
        &mut self,
        prices: &PriceOracle,
        now: DateTime<Utc>,
    ) -> MonitorSummary {
        let mut quotes: HashMap<String, Option<Decimal>> = HashMap::new();
        for trade in self.trades.iter().filter(|t| t.is_open()) {
            if !quotes.contains_key(&trade.signal.asset) {
                let price = prices.price(&trade.signal.asset).await;
                quotes.insert(trade.signal.asset.clone(), price);
            }
        }

        let mut summary = MonitorSummary::default();
        for (index, trade) in self.trades.iter_mut().enumerate().filter(|(_, t)| t.is_open()) {
            let Some(price) = quotes.get(&trade.signal.asset).copied().flatten() else {
                summary.unpriced += 1;
                continue;
            };
            let volume = trade.fill().map(|fill| fill.volume);
            let (Some(ret), Some(volume)) = (trade.position_return(price), volume) else {
                warn!(trade = %trade.id, "Open trade has no usable fill, skipping");
                summary.unpriced += 1;
                continue;
            };
            let pnl = volume * ret;
            if trade.unrealized_pnl != pnl {
                trade.unrealized_pnl = pnl;
                self.changed.insert(index);
            }
            summary.updated += 1;

            let take_profit = trade.signal.take_profit;
            let stop_loss = trade.signal.stop_loss;
            let status = if take_profit.is_some_and(|tp| ret >= tp) {
                TradeStatus::ClosedProfit
            } else if stop_loss.is_some_and(|sl| ret <= -sl) {
                TradeStatus::ClosedLoss
            } else {
                continue;
            };

            self.changed.insert(index);
            trade.status = status;
            trade.realized_pnl = pnl;
            trade.unrealized_pnl = Decimal::ZERO;
            trade.closed_at = Some(now);
            let hold_hours = Decimal::from((now - trade.opened_at).num_seconds()) / Decimal::from(3600);
            self.metrics.record_close(hold_hours, pnl);

            match status {
                TradeStatus::ClosedProfit => summary.closed_profit += 1,
                _ => summary.closed_loss += 1,
            }
            info!(
                asset = %trade.signal.asset,
                direction = %trade.signal.direction,
                status = ?status,
                pnl = %pnl,
                "Closed trade"
            );
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedPriceFeed;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use venue_models::config::{CycleConfig, PricesConfig};
    use venue_models::signal::{Direction, TradingSignal};
    use venue_models::trade::{Fill, Rejection};

    fn signal(asset: &str, direction: Direction) -> TradingSignal {
        let now = Utc::now();
        TradingSignal {
            id: format!("pred-{asset}-c1"),
            market_id: "m1".to_string(),
            asset: asset.to_string(),
            pair: format!("{asset}-USDT"),
            direction,
            size: dec!(0.01),
            confidence: dec!(0.8),
            signal_strength: dec!(0.7),
            agent_count: 3,
            reasoning: "test".to_string(),
            stop_loss: Some(dec!(0.015)),
            take_profit: Some(dec!(0.03)),
            created_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    fn filled(asset: &str, direction: Direction, entry: Decimal, opened_at: DateTime<Utc>) -> TradeRecord {
        TradeRecord::filled(
            signal(asset, direction),
            Fill {
                trade_id: format!("t-{asset}"),
                price: entry,
                volume: dec!(1000),
            },
            opened_at,
        )
    }

    fn oracle(feed: Arc<ScriptedPriceFeed>) -> PriceOracle {
        PriceOracle::new(feed, &PricesConfig::default(), &CycleConfig::default())
    }

    #[test]
    fn record_updates_counters_and_ledger() {
        let mut tracker = PerformanceTracker::new();
        let report = ExecutionReport {
            successful: 2,
            failed: 1,
            total_volume: dec!(2000),
            trades: vec![
                filled("BTC", Direction::Long, dec!(100), Utc::now()),
                filled("BTC", Direction::Short, dec!(100), Utc::now()),
                TradeRecord::failed(signal("ETH", Direction::Long), "rejected".to_string(), Utc::now()),
            ],
            rejections: vec![Rejection {
                signal_id: "pred-SOL-c1".to_string(),
                asset: "SOL".to_string(),
                reason: "Maximum exposure reached".to_string(),
            }],
            skipped: 0,
        };

        tracker.record(&report);

        let metrics = tracker.metrics();
        assert_eq!(metrics.total_signals, 4);
        assert_eq!(metrics.executed_trades, 2);
        assert_eq!(metrics.accuracy_rate, dec!(0.5));
        assert_eq!(tracker.trades().len(), 3);
        assert_eq!(tracker.open_trades().count(), 2);
        assert_eq!(tracker.exposure().open_positions("BTC"), 2);
        assert_eq!(tracker.exposure().open_positions("ETH"), 0);
    }

    #[tokio::test]
    async fn monitoring_closes_on_take_profit_and_stop_loss() {
        let opened = Utc::now() - Duration::hours(2);
        let mut tracker = PerformanceTracker::new();
        tracker.record(&ExecutionReport {
            successful: 3,
            trades: vec![
                filled("BTC", Direction::Long, dec!(100), opened),
                filled("ETH", Direction::Long, dec!(100), opened),
                filled("SOL", Direction::Short, dec!(100), opened),
            ],
            ..Default::default()
        });

        let feed = Arc::new(
            ScriptedPriceFeed::new()
                .with_price("BTC", dec!(104)) // +4% long: take profit
                .with_price("ETH", dec!(98)) // -2% long: stop loss
                .with_price("SOL", dec!(99)), // +1% short: stays open
        );
        let summary = tracker.monitor_open_trades(&oracle(feed), Utc::now()).await;

        assert_eq!(summary.updated, 3);
        assert_eq!(summary.closed_profit, 1);
        assert_eq!(summary.closed_loss, 1);

        let metrics = tracker.metrics();
        assert_eq!(metrics.profitable_trades, 1);
        assert_eq!(metrics.closed_trades, 2);
        // +40 on BTC, -20 on ETH
        assert_eq!(metrics.total_pnl, dec!(20));
        assert!(metrics.avg_hold_time >= dec!(2));

        let sol = tracker.trades().iter().find(|t| t.signal.asset == "SOL").unwrap();
        assert!(sol.is_open());
        assert_eq!(sol.unrealized_pnl, dec!(10));
        assert_eq!(tracker.exposure().total(), 1);
    }

    #[tokio::test]
    async fn unpriced_trades_are_left_open() {
        let mut tracker = PerformanceTracker::new();
        tracker.record(&ExecutionReport {
            successful: 1,
            trades: vec![filled("AVAX", Direction::Long, dec!(32), Utc::now())],
            ..Default::default()
        });

        let feed = Arc::new(ScriptedPriceFeed::new());
        let summary = tracker.monitor_open_trades(&oracle(feed), Utc::now()).await;

        assert_eq!(summary.unpriced, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(tracker.open_trades().count(), 1);
    }

    #[tokio::test]
    async fn closed_trades_are_not_repriced() {
        let mut tracker = PerformanceTracker::new();
        tracker.record(&ExecutionReport {
            successful: 1,
            trades: vec![filled("BTC", Direction::Long, dec!(100), Utc::now())],
            ..Default::default()
        });
        let feed = Arc::new(ScriptedPriceFeed::new().with_price("BTC", dec!(110)));
        let oracle = oracle(feed.clone());

        tracker.monitor_open_trades(&oracle, Utc::now()).await;
        feed.set_price("BTC", dec!(50));
        let summary = tracker.monitor_open_trades(&oracle, Utc::now()).await;

        assert_eq!(summary, MonitorSummary::default());
        assert_eq!(tracker.metrics().profitable_trades, 1);
        assert_eq!(tracker.metrics().total_pnl, dec!(100));
    }

    #[tokio::test]
    async fn changed_records_cover_new_and_repriced_trades() {
        let mut tracker = PerformanceTracker::new();
        tracker.record(&ExecutionReport {
            successful: 2,
            trades: vec![
                filled("BTC", Direction::Long, dec!(100), Utc::now()),
                filled("AVAX", Direction::Long, dec!(32), Utc::now()),
            ],
            ..Default::default()
        });
        assert_eq!(tracker.take_changed().len(), 2);
        assert!(tracker.take_changed().is_empty());

        // AVAX has no price, so only BTC is touched
        let feed = Arc::new(ScriptedPriceFeed::new().with_price("BTC", dec!(104)));
        tracker.monitor_open_trades(&oracle(feed), Utc::now()).await;

        let changed = tracker.take_changed();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].signal.asset, "BTC");
        assert_eq!(changed[0].status, TradeStatus::ClosedProfit);
        assert_eq!(tracker.trades().len(), 2);
    }
}
