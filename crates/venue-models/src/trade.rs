use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signal::TradingSignal;

/// What the execution backend reports for a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fill {
    pub trade_id: String,
    pub price: Decimal,
    /// Notional traded, in quote currency.
    pub volume: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Filled(Fill),
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    ClosedProfit,
    ClosedLoss,
    /// The backend refused or errored; the record is kept for the audit trail.
    Failed,
}

/// Ledger entry for one execution attempt. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub id: Uuid,
    pub signal: TradingSignal,
    pub outcome: ExecutionOutcome,
    pub status: TradeStatus,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TradeRecord {
    pub fn filled(signal: TradingSignal, fill: Fill, opened_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            signal,
            outcome: ExecutionOutcome::Filled(fill),
            status: TradeStatus::Open,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            opened_at,
            closed_at: None,
        }
    }

    pub fn failed(signal: TradingSignal, reason: String, attempted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            signal,
            outcome: ExecutionOutcome::Failed { reason },
            status: TradeStatus::Failed,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            opened_at: attempted_at,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn fill(&self) -> Option<&Fill> {
        match &self.outcome {
            ExecutionOutcome::Filled(fill) => Some(fill),
            ExecutionOutcome::Failed { .. } => None,
        }
    }

    /// Position return at `price`, signed by direction. `None` for unfilled
    /// trades or a zero entry price.
    pub fn position_return(&self, price: Decimal) -> Option<Decimal> {
        let entry = self.fill()?.price;
        if entry.is_zero() {
            return None;
        }
        Some((price - entry) / entry * self.signal.direction.sign())
    }
}

/// A signal the risk assessor turned away before submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub signal_id: String,
    pub asset: String,
    pub reason: String,
}

/// Aggregate result of one execution batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExecutionReport {
    pub successful: usize,
    pub failed: usize,
    pub total_volume: Decimal,
    /// One record per submitted signal, filled or failed.
    pub trades: Vec<TradeRecord>,
    pub rejections: Vec<Rejection>,
    /// Approved signals never started because shutdown was requested.
    pub skipped: usize,
}

impl ExecutionReport {
    /// Every signal the bridge was handed, whatever happened to it.
    pub fn signals_seen(&self) -> usize {
        self.successful + self.failed + self.rejections.len() + self.skipped
    }
}
