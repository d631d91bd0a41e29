use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use venue_models::metrics::MetricsSnapshot;
use venue_models::trade::TradeRecord;

use crate::error::StoreError;
use crate::sink::RecordSink;

/// Journal table shared with external consumers.
///
/// Keys follow `metrics:latest`, `metrics:cycle:{n}` and `trade:{uuid}`.
pub const JOURNAL_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS journal_entries (
    key         TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    value_json  TEXT NOT NULL,
    symbol      TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_journal_category ON journal_entries(category);
CREATE INDEX IF NOT EXISTS idx_journal_symbol ON journal_entries(symbol);
";

const UPSERT_SQL: &str = "\
INSERT INTO journal_entries (key, category, value_json, symbol, created_at, updated_at) \
VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at";

/// SQLite-backed journal of metrics snapshots and trade records.
///
/// Opened in WAL mode so dashboards can read while the venue writes.
/// Access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct SqliteJournal {
    conn: Mutex<Connection>,
}

impl SqliteJournal {
    /// Open (or create) the journal database and its schema.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(JOURNAL_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::info!(path, "Opened SQLite journal");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(JOURNAL_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// Raw JSON stored under `key`.
    pub fn get_json(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT value_json FROM journal_entries WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        );
        match result {
            Ok(json) => Ok(Some(json)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Number of entries in a category.
    pub fn count(&self, category: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: usize = conn.query_row(
            "SELECT COUNT(*) FROM journal_entries WHERE category = ?1",
            rusqlite::params![category],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl RecordSink for SqliteJournal {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write_metrics(&self, snapshot: &MetricsSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
            stmt.execute(rusqlite::params![
                format!("metrics:cycle:{}", snapshot.cycle),
                "metrics",
                json,
                Option::<String>::None,
                now,
            ])?;
            stmt.execute(rusqlite::params![
                "metrics:latest",
                "metrics_latest",
                json,
                Option::<String>::None,
                now,
            ])?;
        }
        tx.commit()?;
        Ok(())
    }

    // Rows are keyed by trade id, so upserting the changed records is enough.
    fn wants_full_ledger(&self) -> bool {
        false
    }

    fn write_trades(&self, trades: &[TradeRecord]) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
            for trade in trades {
                stmt.execute(rusqlite::params![
                    format!("trade:{}", trade.id),
                    "trade",
                    serde_json::to_string(trade)?,
                    trade.signal.asset,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
