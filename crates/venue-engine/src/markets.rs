use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use venue_models::config::MarketsConfig;
use venue_models::market::{Market, MarketType};

use crate::pricing::PriceOracle;

/// What one refresh did to the book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshSummary {
    pub expired: usize,
    pub created: usize,
}

/// Active prediction markets keyed by id.
#[derive(Debug, Default)]
pub struct MarketBook {
    markets: BTreeMap<String, Market>,
    last_created_at: Option<DateTime<Utc>>,
    total_created: u64,
    rotation: usize,
}

impl MarketBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn total_created(&self) -> u64 {
        self.total_created
    }

    pub fn get(&self, id: &str) -> Option<&Market> {
        self.markets.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Market> {
        self.markets.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// Add an externally created market. Counts toward `total_created`.
    pub fn insert(&mut self, market: Market) {
        self.total_created += 1;
        self.markets.insert(market.id.clone(), market);
    }

    /// Drop expired markets, then open a new round of markets when due.
    pub async fn refresh(
        &mut self,
        config: &MarketsConfig,
        prices: &PriceOracle,
        now: DateTime<Utc>,
    ) -> RefreshSummary {
        let mut summary = RefreshSummary::default();

        let before = self.markets.len();
        self.markets.retain(|_, market| !market.is_expired(now));
        summary.expired = before - self.markets.len();
        if summary.expired > 0 {
            info!(expired = summary.expired, "Removed expired markets");
        }

        if !self.creation_due(config, now) || config.assets.is_empty() {
            return summary;
        }

        for market_type in &config.market_types {
            if self.markets.len() >= config.max_active_markets {
                break;
            }
            let asset = config.assets[self.rotation % config.assets.len()].clone();
            self.rotation += 1;

            let Some(market) = self.build_market(config, prices, *market_type, &asset, now).await else {
                continue;
            };
            info!(market = %market.id, question = %market.question, "Created prediction market");
            self.insert(market);
            summary.created += 1;
        }

        if summary.created > 0 {
            self.last_created_at = Some(now);
        }
        summary
    }

    fn creation_due(&self, config: &MarketsConfig, now: DateTime<Utc>) -> bool {
        if self.markets.len() >= config.max_active_markets {
            return false;
        }
        match self.last_created_at {
            Some(last) if !self.markets.is_empty() => {
                now - last >= Duration::hours(config.auto_create_interval_hours)
            }
            _ => true,
        }
    }

    async fn build_market(
        &self,
        config: &MarketsConfig,
        prices: &PriceOracle,
        market_type: MarketType,
        asset: &str,
        now: DateTime<Utc>,
    ) -> Option<Market> {
        let expires_at = now + Duration::days(config.market_lifetime_days);
        let expiry = expires_at.format("%Y-%m-%d");
        let reference_price = prices.price(asset).await;

        let (question, target_price) = match market_type {
            MarketType::PriceTarget => {
                let Some(price) = reference_price else {
                    warn!(asset, "No price for price-target market, skipping");
                    return None;
                };
                let target = (price * config.price_target_multiplier).round_dp(2);
                (format!("Will {asset} be above {target} by {expiry}?"), Some(target))
            }
            MarketType::PerformanceThreshold => (
                format!("Will agents trading {asset} achieve >65% win rate by {expiry}?"),
                None,
            ),
            MarketType::Trend => (
                format!("Will {asset} extend its current trend through {expiry}?"),
                None,
            ),
        };

        Some(Market {
            id: format!("{}_{}_{}", market_type.as_str(), asset, self.total_created + 1),
            asset: asset.to_string(),
            market_type,
            question,
            reference_price,
            target_price,
            created_at: now,
            expires_at,
            participants: Default::default(),
        })
    }
}
