use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use venue_models::signal::TradingSignal;
use venue_models::trade::{ExecutionReport, Fill, Rejection, TradeRecord};

use crate::collaborators::{ExecutionBackend, OrderRequest};
use crate::error::VenueError;
use crate::performance::PerformanceTracker;
use crate::risk::RiskAssessor;

/// Result of one dispatched signal. `None` when shutdown was requested before
/// the attempt started.
type Attempt = (usize, TradingSignal, Option<Result<Fill, VenueError>>, DateTime<Utc>);

/// Risk-checks signals and submits the approved ones to the backend.
///
/// Risk assessment is sequential so each approval counts against the exposure
/// seen by the next signal. Submissions run concurrently, at most
/// `max_concurrent` at a time, and one failing order never stops the others.
pub struct ExecutionBridge {
    backend: Arc<dyn ExecutionBackend>,
    risk: RiskAssessor,
    max_concurrent: usize,
}

impl ExecutionBridge {
    pub fn new(backend: Arc<dyn ExecutionBackend>, risk: RiskAssessor, max_concurrent: usize) -> Self {
        Self {
            backend,
            risk,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Execute a batch and fold the outcome into `tracker`.
    ///
    /// Attempts already started when `cancel` fires run to completion; the
    /// rest are counted as skipped.
    pub async fn execute(
        &self,
        signals: Vec<TradingSignal>,
        tracker: &mut PerformanceTracker,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let mut exposure = tracker.exposure();
        let mut approved = Vec::with_capacity(signals.len());

        for mut signal in signals {
            let decision = self.risk.assess(&signal, &exposure);
            if !decision.approved {
                warn!(
                    asset = %signal.asset,
                    signal = %signal.id,
                    reason = %decision.reason,
                    "Risk check rejected signal"
                );
                report.rejections.push(Rejection {
                    signal_id: signal.id.clone(),
                    asset: signal.asset.clone(),
                    reason: decision.reason,
                });
                continue;
            }
            signal.stop_loss = decision.stop_loss;
            signal.take_profit = decision.take_profit;
            exposure.add(&signal.asset);
            approved.push(signal);
        }

        let mut attempts: Vec<Attempt> = stream::iter(approved.into_iter().enumerate())
            .map(|(index, signal)| async move {
                if cancel.is_cancelled() {
                    return (index, signal, None, Utc::now());
                }
                let result = match OrderRequest::from_signal(&signal) {
                    Some(order) => self.backend.submit(&order).await,
                    None => Err(VenueError::Backend(format!(
                        "signal {} has no risk parameters",
                        signal.id
                    ))),
                };
                (index, signal, Some(result), Utc::now())
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        attempts.sort_by_key(|(index, ..)| *index);

        for (_, signal, result, at) in attempts {
            match result {
                None => {
                    report.skipped += 1;
                }
                Some(Ok(fill)) => {
                    info!(
                        asset = %signal.asset,
                        direction = %signal.direction,
                        size = %signal.size,
                        price = %fill.price,
                        trade_id = %fill.trade_id,
                        "Executed trade"
                    );
                    report.successful += 1;
                    report.total_volume += fill.volume;
                    report.trades.push(TradeRecord::filled(signal, fill, at));
                }
                Some(Err(e)) => {
                    warn!(asset = %signal.asset, signal = %signal.id, error = %e, "Trade execution failed");
                    report.failed += 1;
                    report.trades.push(TradeRecord::failed(signal, e.to_string(), at));
                }
            }
        }

        if report.skipped > 0 {
            warn!(skipped = report.skipped, "Shutdown requested, approved signals not submitted");
        }
        info!(
            successful = report.successful,
            failed = report.failed,
            rejected = report.rejections.len(),
            volume = %report.total_volume,
            "Execution batch complete"
        );

        tracker.record(&report);
        report
    }
}
