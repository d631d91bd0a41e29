use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a risk assessment for one signal. Rejections are normal outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskDecision {
    pub approved: bool,
    pub reason: String,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

impl RiskDecision {
    pub fn approve(stop_loss: Decimal, take_profit: Decimal) -> Self {
        Self {
            approved: true,
            reason: "Trade approved".to_string(),
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            stop_loss: None,
            take_profit: None,
        }
    }
}
