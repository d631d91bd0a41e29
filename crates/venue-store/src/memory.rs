use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;

/// Last successfully observed price per asset, backed by moka.
///
/// Entries live for the configured TTL so a long feed outage eventually
/// stops serving stale prices.
pub struct LastKnownPrices {
    inner: Cache<String, Decimal>,
}

impl LastKnownPrices {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, asset: &str) -> Option<Decimal> {
        self.inner.get(asset).await
    }

    pub async fn remember(&self, asset: &str, price: Decimal) {
        self.inner.insert(asset.to_string(), price).await;
    }

    pub async fn forget(&self, asset: &str) {
        self.inner.invalidate(asset).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn remember_and_get() {
        let prices = LastKnownPrices::new(100, Duration::from_secs(60));
        prices.remember("BTC", dec!(95000)).await;
        assert_eq!(prices.get("BTC").await, Some(dec!(95000)));
    }

    #[tokio::test]
    async fn newer_price_replaces_older() {
        let prices = LastKnownPrices::new(100, Duration::from_secs(60));
        prices.remember("ETH", dec!(3200)).await;
        prices.remember("ETH", dec!(3150)).await;
        assert_eq!(prices.get("ETH").await, Some(dec!(3150)));
    }

    #[tokio::test]
    async fn get_missing() {
        let prices = LastKnownPrices::new(100, Duration::from_secs(60));
        assert_eq!(prices.get("SOL").await, None);
    }

    #[tokio::test]
    async fn forget() {
        let prices = LastKnownPrices::new(100, Duration::from_secs(60));
        prices.remember("ARB", dec!(0.85)).await;
        prices.forget("ARB").await;
        assert_eq!(prices.get("ARB").await, None);
    }

    #[tokio::test]
    async fn ttl_expiration() {
        let prices = LastKnownPrices::new(100, Duration::from_millis(50));
        prices.remember("AVAX", dec!(32)).await;
        assert!(prices.get("AVAX").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(prices.get("AVAX").await.is_none());
    }
}
