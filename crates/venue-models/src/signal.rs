use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Multiplies a price return into a position return.
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => -Decimal::ONE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directional, sized instruction derived from one market consensus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingSignal {
    /// Unique per cycle and asset.
    pub id: String,
    pub market_id: String,
    pub asset: String,
    pub pair: String,
    pub direction: Direction,
    /// Fraction of capital, within the configured sizing bounds.
    pub size: Decimal,
    pub confidence: Decimal,
    /// Signed consensus strength the signal was derived from.
    pub signal_strength: Decimal,
    pub agent_count: usize,
    pub reasoning: String,
    /// Filled in once the risk assessor approves the signal.
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TradingSignal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn direction_sign_and_serialization() {
        assert_eq!(Direction::Long.sign(), dec!(1));
        assert_eq!(Direction::Short.sign(), dec!(-1));
        assert_eq!(serde_json::to_string(&Direction::Short).unwrap(), "\"short\"");
        assert_eq!(Direction::Long.to_string(), "long");
    }

    #[test]
    fn signal_expiry() {
        let now = Utc::now();
        let signal = TradingSignal {
            id: "pred-BTC-c1".to_string(),
            market_id: "m1".to_string(),
            asset: "BTC".to_string(),
            pair: "BTC-USDT".to_string(),
            direction: Direction::Long,
            size: dec!(0.01),
            confidence: dec!(0.8),
            signal_strength: dec!(0.6),
            agent_count: 3,
            reasoning: "test".to_string(),
            stop_loss: None,
            take_profit: None,
            created_at: now,
            expires_at: now + Duration::hours(24),
        };
        assert!(!signal.is_expired(now + Duration::hours(23)));
        assert!(signal.is_expired(now + Duration::hours(24)));
    }
}
