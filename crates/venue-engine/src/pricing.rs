use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, warn};
use venue_models::config::{CycleConfig, PricesConfig};
use venue_store::LastKnownPrices;

use crate::collaborators::PriceFeed;

/// Price lookup with fallback: live feed (with timeout) → last known → configured default.
///
/// Never fails; `None` means no price could be obtained from any tier and the
/// caller should skip whatever depended on it.
pub struct PriceOracle {
    feed: Arc<dyn PriceFeed>,
    last_known: LastKnownPrices,
    defaults: HashMap<String, Decimal>,
    timeout: Duration,
}

impl PriceOracle {
    pub fn new(feed: Arc<dyn PriceFeed>, prices: &PricesConfig, cycle: &CycleConfig) -> Self {
        Self {
            feed,
            last_known: LastKnownPrices::new(
                prices.last_known_capacity,
                Duration::from_secs(prices.last_known_ttl_seconds),
            ),
            defaults: prices.default_prices.clone(),
            timeout: Duration::from_secs(cycle.price_timeout_seconds),
        }
    }

    pub async fn price(&self, asset: &str) -> Option<Decimal> {
        match tokio::time::timeout(self.timeout, self.feed.price(asset)).await {
            Ok(Ok(price)) if price > Decimal::ZERO => {
                self.last_known.remember(asset, price).await;
                return Some(price);
            }
            Ok(Ok(price)) => {
                warn!(asset, %price, "Price feed returned a non-positive price");
            }
            Ok(Err(e)) => {
                warn!(asset, error = %e, "Price feed lookup failed");
            }
            Err(_) => {
                warn!(
                    asset,
                    timeout_secs = self.timeout.as_secs(),
                    "Price feed lookup timed out"
                );
            }
        }

        if let Some(price) = self.last_known.get(asset).await {
            debug!(asset, %price, "Using last known price");
            return Some(price);
        }
        let fallback = self.defaults.get(asset).copied();
        if fallback.is_none() {
            warn!(asset, "No price available from feed, cache or defaults");
        }
        fallback
    }
}
