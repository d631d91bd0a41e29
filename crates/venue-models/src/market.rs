use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a prediction market asks its participants about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    /// "Will ASSET be above TARGET by EXPIRY?"
    PriceTarget,
    /// "Will the agents reach a win-rate threshold this period?"
    PerformanceThreshold,
    /// "Will ASSET keep trending in its current direction?"
    Trend,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::PriceTarget => "price_target",
            MarketType::PerformanceThreshold => "performance_threshold",
            MarketType::Trend => "trend",
        }
    }
}

/// A prediction market that agents are assigned to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Market {
    pub id: String,
    pub asset: String,
    pub market_type: MarketType,
    pub question: String,
    /// Price observed at creation, when one was available.
    pub reference_price: Option<Decimal>,
    /// Only set for price-target markets.
    pub target_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub participants: BTreeSet<String>,
}

impl Market {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn has_participant(&self, agent_id: &str) -> bool {
        self.participants.contains(agent_id)
    }

    /// Add participants up to `cap`. Duplicates are ignored. Returns how many were added.
    pub fn add_participants<I>(&mut self, agent_ids: I, cap: usize) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.participants.len();
        for id in agent_ids {
            if self.participants.len() >= cap {
                break;
            }
            self.participants.insert(id);
        }
        self.participants.len() - before
    }
}
