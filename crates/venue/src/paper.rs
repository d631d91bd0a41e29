//! Paper-trading collaborators: everything the venue needs to run a full
//! cycle locally, with prices from configuration and predictions from a
//! JSON file that can be edited while the daemon runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use venue_engine::{AgentPool, ExecutionBackend, OrderRequest, PredictionSource, PriceFeed, VenueError};
use venue_models::market::Market;
use venue_models::prediction::AgentPrediction;
use venue_models::trade::Fill;

/// Quotes from a fixed table.
pub struct StaticPriceFeed {
    prices: HashMap<String, Decimal>,
}

impl StaticPriceFeed {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self {
            prices: prices
                .into_iter()
                .map(|(asset, price)| (asset.to_uppercase(), price))
                .collect(),
        }
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn price(&self, asset: &str) -> Result<Decimal, VenueError> {
        self.prices
            .get(&asset.to_uppercase())
            .copied()
            .ok_or_else(|| VenueError::PriceFeed(format!("no static price for {asset}")))
    }
}

/// Fills every order at the feed's current price.
pub struct PaperBackend {
    prices: Arc<dyn PriceFeed>,
    capital: Decimal,
}

impl PaperBackend {
    pub fn new(prices: Arc<dyn PriceFeed>, capital: Decimal) -> Self {
        Self { prices, capital }
    }
}

#[async_trait]
impl ExecutionBackend for PaperBackend {
    async fn submit(&self, order: &OrderRequest) -> Result<Fill, VenueError> {
        let price = self
            .prices
            .price(&order.asset)
            .await
            .map_err(|e| VenueError::Backend(format!("cannot fill {}: {e}", order.pair)))?;
        let fill = Fill {
            trade_id: format!("paper-{}", Uuid::new_v4()),
            price,
            volume: order.size * self.capital,
        };
        info!(
            pair = %order.pair,
            direction = %order.direction,
            price = %fill.price,
            volume = %fill.volume,
            "Paper fill"
        );
        Ok(fill)
    }
}

/// Assigns agents from a configured list of ids.
pub struct StaticAgentPool {
    agents: Vec<String>,
}

impl StaticAgentPool {
    pub fn new(agents: Vec<String>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl AgentPool for StaticAgentPool {
    async fn deploy(&self, market: &Market, count: usize) -> Result<Vec<String>, VenueError> {
        if self.agents.is_empty() {
            return Err(VenueError::AgentPool("agent pool is empty".to_string()));
        }
        Ok(self
            .agents
            .iter()
            .filter(|agent| !market.has_participant(agent))
            .take(count)
            .cloned()
            .collect())
    }

    async fn trigger_predictions(&self, market: &Market) -> Result<(), VenueError> {
        debug!(
            market = %market.id,
            participants = market.participant_count(),
            "Prediction round requested"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FilePrediction {
    agent_id: String,
    signal_strength: Decimal,
    confidence: Decimal,
    #[serde(default)]
    reputation_weight: Option<Decimal>,
}

/// Reads `{"BTC": [{"agent_id": ..., "signal_strength": ..., ...}], ...}` on
/// every call. A missing file means no predictions yet.
pub struct FilePredictionSource {
    path: PathBuf,
}

impl FilePredictionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PredictionSource for FilePredictionSource {
    async fn predictions(&self, market: &Market) -> Result<Vec<AgentPrediction>, VenueError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Predictions file not found");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(VenueError::Predictions(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let mut by_asset: HashMap<String, Vec<serde_json::Value>> = serde_json::from_str(&raw)
            .map_err(|e| {
                VenueError::Predictions(format!("failed to parse {}: {e}", self.path.display()))
            })?;

        let key = by_asset
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&market.asset))
            .cloned();
        let entries = key.and_then(|k| by_asset.remove(&k)).unwrap_or_default();

        let mut predictions = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<FilePrediction>(entry) {
                Ok(p) => predictions.push(AgentPrediction {
                    agent_id: p.agent_id,
                    market_id: market.id.clone(),
                    signal_strength: p.signal_strength,
                    confidence: p.confidence,
                    reputation_weight: p.reputation_weight,
                }),
                Err(e) => warn!(
                    asset = %market.asset,
                    index,
                    error = %e,
                    "Skipping malformed prediction entry"
                ),
            }
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use venue_models::market::MarketType;
    use venue_models::signal::Direction;

    fn market(asset: &str, participants: &[&str]) -> Market {
        let now = Utc::now();
        Market {
            id: format!("trend_{asset}_1"),
            asset: asset.to_string(),
            market_type: MarketType::Trend,
            question: format!("Will {asset} extend its current trend?"),
            reference_price: None,
            target_price: None,
            created_at: now,
            expires_at: now + Duration::days(30),
            participants: participants.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn feed() -> Arc<StaticPriceFeed> {
        Arc::new(StaticPriceFeed::new(HashMap::from([
            ("btc".to_string(), dec!(95000)),
            ("ETH".to_string(), dec!(3200)),
        ])))
    }

    #[tokio::test]
    async fn static_feed_is_case_insensitive() {
        let feed = feed();
        assert_eq!(feed.price("BTC").await.unwrap(), dec!(95000));
        assert_eq!(feed.price("eth").await.unwrap(), dec!(3200));
        assert!(matches!(feed.price("SOL").await, Err(VenueError::PriceFeed(_))));
    }

    #[tokio::test]
    async fn paper_backend_fills_at_feed_price() {
        let backend = PaperBackend::new(feed(), dec!(100000));
        let order = OrderRequest {
            signal_id: "pred-BTC-c1".to_string(),
            asset: "BTC".to_string(),
            pair: "BTC-USDT".to_string(),
            direction: Direction::Long,
            size: dec!(0.0145),
            stop_loss: dec!(0.015),
            take_profit: dec!(0.03),
        };
        let fill = backend.submit(&order).await.unwrap();
        assert_eq!(fill.price, dec!(95000));
        assert_eq!(fill.volume, dec!(1450));
        assert!(fill.trade_id.starts_with("paper-"));

        let unpriced = OrderRequest {
            asset: "DOGE".to_string(),
            pair: "DOGE-USDT".to_string(),
            ..order
        };
        assert!(matches!(backend.submit(&unpriced).await, Err(VenueError::Backend(_))));
    }

    #[tokio::test]
    async fn agent_pool_skips_existing_participants() {
        let pool = StaticAgentPool::new(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        let deployed = pool.deploy(&market("BTC", &["a", "c"]), 2).await.unwrap();
        assert_eq!(deployed, vec!["b".to_string(), "d".to_string()]);

        let empty = StaticAgentPool::new(Vec::new());
        assert!(empty.deploy(&market("BTC", &[]), 3).await.is_err());
    }

    #[tokio::test]
    async fn file_predictions_are_stamped_with_market() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");
        std::fs::write(
            &path,
            r#"{
                "btc": [
                    {"agent_id": "a", "signal_strength": 0.73, "confidence": 0.85, "reputation_weight": 0.85},
                    {"agent_id": "b", "signal_strength": 0.68, "confidence": 0.78}
                ]
            }"#,
        )
        .unwrap();
        let source = FilePredictionSource::new(&path);

        let predictions = source.predictions(&market("BTC", &["a", "b"])).await.unwrap();
        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(|p| p.market_id == "trend_BTC_1"));
        assert_eq!(predictions[0].reputation_weight, Some(dec!(0.85)));
        assert_eq!(predictions[1].reputation_weight, None);

        assert!(source.predictions(&market("ETH", &[])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped_individually() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");
        std::fs::write(
            &path,
            r#"{
                "BTC": [
                    {"agent_id": "a", "signal_strength": 0.73, "confidence": 0.85},
                    {"agent_id": "b", "signal_strength": 0.68, "confidence": 0.78},
                    {"agent_id": "c", "signal_strength": "oops", "confidence": 0.71},
                    {"agent_id": "d", "signal_strength": 0.82, "confidence": 0.71}
                ],
                "ETH": [
                    {"agent_id": "a", "signal_strength": 0.4}
                ]
            }"#,
        )
        .unwrap();
        let source = FilePredictionSource::new(&path);

        let btc = source.predictions(&market("BTC", &[])).await.unwrap();
        let agents: Vec<_> = btc.iter().map(|p| p.agent_id.as_str()).collect();
        assert_eq!(agents, vec!["a", "b", "d"]);

        assert!(source.predictions(&market("ETH", &[])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_empty_but_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FilePredictionSource::new(dir.path().join("absent.json"));
        assert!(missing.predictions(&market("BTC", &[])).await.unwrap().is_empty());

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();
        let broken = FilePredictionSource::new(&path);
        assert!(matches!(
            broken.predictions(&market("BTC", &[])).await,
            Err(VenueError::Predictions(_))
        ));
    }
}
