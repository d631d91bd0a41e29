use venue_models::metrics::MetricsSnapshot;
use venue_models::trade::TradeRecord;

use crate::error::StoreError;

/// Write-only destination for metrics and the trade ledger.
///
/// Callers treat writes as fire-and-forget: a failing sink is logged and the
/// cycle carries on.
pub trait RecordSink: Send + Sync {
    fn name(&self) -> &str;

    fn write_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), StoreError>;

    /// With `false`, `write_trades` receives only the records created or
    /// changed since the previous write instead of the whole ledger.
    fn wants_full_ledger(&self) -> bool {
        true
    }

    fn write_trades(&self, trades: &[TradeRecord]) -> Result<(), StoreError>;
}
