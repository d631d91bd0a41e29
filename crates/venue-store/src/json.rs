use std::fs;
use std::path::{Path, PathBuf};

use venue_models::metrics::MetricsSnapshot;
use venue_models::trade::TradeRecord;

use crate::error::StoreError;
use crate::sink::RecordSink;

/// Writes the latest metrics snapshot (and optionally the trade ledger) as
/// pretty JSON files for dashboards to poll.
pub struct JsonFileSink {
    metrics_path: Option<PathBuf>,
    trades_path: Option<PathBuf>,
}

impl JsonFileSink {
    pub fn new(metrics_path: Option<PathBuf>, trades_path: Option<PathBuf>) -> Self {
        Self {
            metrics_path,
            trades_path,
        }
    }
}

/// Write through a sibling temp file so readers never see a half-written document.
fn write_json_atomic(path: &Path, json: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), bytes = json.len(), "Wrote JSON record");
    Ok(())
}

impl RecordSink for JsonFileSink {
    fn name(&self) -> &str {
        "json"
    }

    fn write_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), StoreError> {
        match &self.metrics_path {
            Some(path) => write_json_atomic(path, &serde_json::to_string_pretty(snapshot)?),
            None => Ok(()),
        }
    }

    fn write_trades(&self, trades: &[TradeRecord]) -> Result<(), StoreError> {
        match &self.trades_path {
            Some(path) => write_json_atomic(path, &serde_json::to_string_pretty(trades)?),
            None => Ok(()),
        }
    }
}
