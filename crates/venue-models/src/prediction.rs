use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One agent's view on one market for the current cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentPrediction {
    pub agent_id: String,
    pub market_id: String,
    /// -1.0 to 1.0. Sign is direction, magnitude is conviction.
    pub signal_strength: Decimal,
    /// 0.0 to 1.0.
    pub confidence: Decimal,
    /// Normalized reputation. `None` means the caller did not know it.
    #[serde(default)]
    pub reputation_weight: Option<Decimal>,
}

impl AgentPrediction {
    /// Check the value ranges. Returns the reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.agent_id.is_empty() {
            return Err("missing agent_id".to_string());
        }
        if self.signal_strength < -Decimal::ONE || self.signal_strength > Decimal::ONE {
            return Err(format!(
                "signal_strength {} outside [-1, 1]",
                self.signal_strength
            ));
        }
        if self.confidence < Decimal::ZERO || self.confidence > Decimal::ONE {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if let Some(weight) = self.reputation_weight {
            if weight < Decimal::ZERO {
                return Err(format!("negative reputation weight {weight}"));
            }
        }
        Ok(())
    }
}

/// Reputation-weighted aggregate of a market's predictions.
///
/// Derived every cycle from a single prediction snapshot; never stored as
/// ground truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConsensus {
    pub market_id: String,
    pub asset: String,
    pub signal_strength: Decimal,
    pub confidence: Decimal,
    /// Number of predictions that contributed.
    pub agent_count: usize,
    /// Snapshot instant the predictions were captured at.
    pub timestamp: DateTime<Utc>,
}
