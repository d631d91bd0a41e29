use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use venue_models::config::AgentsConfig;
use venue_models::market::Market;
use venue_models::prediction::{AgentPrediction, MarketConsensus};

/// Predictions for every market, captured at one instant.
///
/// All consensus values in a cycle come from the same snapshot, so no market
/// can mix predictions from two cycles.
#[derive(Debug, Clone)]
pub struct PredictionSnapshot {
    pub captured_at: DateTime<Utc>,
    by_market: HashMap<String, Vec<AgentPrediction>>,
}

impl PredictionSnapshot {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            by_market: HashMap::new(),
        }
    }

    pub fn insert(&mut self, market_id: &str, predictions: Vec<AgentPrediction>) {
        self.by_market.insert(market_id.to_string(), predictions);
    }

    pub fn predictions(&self, market_id: &str) -> &[AgentPrediction] {
        self.by_market
            .get(market_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_predictions(&self) -> usize {
        self.by_market.values().map(Vec::len).sum()
    }
}

/// Reputation-weighted mean of agent predictions.
///
/// "No consensus" (`None`) is a normal outcome: too few participants, fewer
/// than two usable predictions, or zero total weight.
#[derive(Debug, Clone)]
pub struct ConsensusAggregator {
    min_agents_per_market: usize,
    default_weight: Decimal,
}

impl ConsensusAggregator {
    pub fn new(config: &AgentsConfig) -> Self {
        Self {
            min_agents_per_market: config.min_agents_per_market,
            default_weight: config.default_reputation_weight,
        }
    }

    pub fn aggregate(
        &self,
        market: &Market,
        predictions: &[AgentPrediction],
        captured_at: DateTime<Utc>,
    ) -> Option<MarketConsensus> {
        if market.participant_count() < self.min_agents_per_market {
            debug!(
                market = %market.id,
                participants = market.participant_count(),
                required = self.min_agents_per_market,
                "Not enough participants for consensus"
            );
            return None;
        }

        let contributing = self.usable_predictions(market, predictions);
        if contributing.len() < 2 {
            debug!(market = %market.id, usable = contributing.len(), "Too few predictions for consensus");
            return None;
        }

        let Some((weighted_signal, weighted_confidence, total_weight)) =
            self.weighted_sums(&contributing)
        else {
            warn!(market = %market.id, "Reputation weights overflow, skipping consensus");
            return None;
        };

        if total_weight.is_zero() {
            debug!(market = %market.id, "All contributing predictions have zero weight");
            return None;
        }

        Some(MarketConsensus {
            market_id: market.id.clone(),
            asset: market.asset.clone(),
            signal_strength: (weighted_signal / total_weight).clamp(-Decimal::ONE, Decimal::ONE),
            confidence: (weighted_confidence / total_weight).clamp(Decimal::ZERO, Decimal::ONE),
            agent_count: contributing.len(),
            timestamp: captured_at,
        })
    }

    /// Aggregate every market against one snapshot.
    pub fn aggregate_all<'a, I>(&self, markets: I, snapshot: &PredictionSnapshot) -> Vec<MarketConsensus>
    where
        I: IntoIterator<Item = &'a Market>,
    {
        markets
            .into_iter()
            .filter_map(|market| {
                self.aggregate(market, snapshot.predictions(&market.id), snapshot.captured_at)
            })
            .collect()
    }

    /// Weighted signal, weighted confidence and total weight. `None` when
    /// the weights are too large to sum.
    fn weighted_sums(&self, contributing: &[&AgentPrediction]) -> Option<(Decimal, Decimal, Decimal)> {
        let mut total_weight = Decimal::ZERO;
        let mut weighted_signal = Decimal::ZERO;
        let mut weighted_confidence = Decimal::ZERO;
        for prediction in contributing {
            let weight = prediction.reputation_weight.unwrap_or(self.default_weight);
            weighted_signal =
                weighted_signal.checked_add(prediction.signal_strength.checked_mul(weight)?)?;
            weighted_confidence =
                weighted_confidence.checked_add(prediction.confidence.checked_mul(weight)?)?;
            total_weight = total_weight.checked_add(weight)?;
        }
        Some((weighted_signal, weighted_confidence, total_weight))
    }

    /// Drop malformed, foreign, non-participant and duplicate predictions.
    fn usable_predictions<'a>(
        &self,
        market: &Market,
        predictions: &'a [AgentPrediction],
    ) -> Vec<&'a AgentPrediction> {
        let mut seen = HashSet::new();
        predictions
            .iter()
            .filter(|p| {
                if p.market_id != market.id {
                    warn!(market = %market.id, agent = %p.agent_id, other = %p.market_id, "Skipping prediction for another market");
                    return false;
                }
                if let Err(reason) = p.validate() {
                    warn!(market = %market.id, agent = %p.agent_id, reason = %reason, "Skipping invalid prediction");
                    return false;
                }
                if !market.has_participant(&p.agent_id) {
                    warn!(market = %market.id, agent = %p.agent_id, "Skipping prediction from non-participant");
                    return false;
                }
                if !seen.insert(p.agent_id.as_str()) {
                    warn!(market = %market.id, agent = %p.agent_id, "Skipping duplicate prediction");
                    return false;
                }
                true
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use venue_models::market::MarketType;

    fn market(participants: &[&str]) -> Market {
        let now = Utc::now();
        Market {
            id: "price_target_BTC_1".to_string(),
            asset: "BTC".to_string(),
            market_type: MarketType::PriceTarget,
            question: "Will BTC be above 109250?".to_string(),
            reference_price: Some(dec!(95000)),
            target_price: Some(dec!(109250)),
            created_at: now,
            expires_at: now + Duration::days(30),
            participants: participants.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn prediction(agent: &str, signal: Decimal, confidence: Decimal, weight: Option<Decimal>) -> AgentPrediction {
        AgentPrediction {
            agent_id: agent.to_string(),
            market_id: "price_target_BTC_1".to_string(),
            signal_strength: signal,
            confidence,
            reputation_weight: weight,
        }
    }

    fn aggregator() -> ConsensusAggregator {
        ConsensusAggregator::new(&AgentsConfig::default())
    }

    fn approx(actual: Decimal, expected: Decimal) {
        assert!(
            (actual - expected).abs() < dec!(0.0001),
            "{actual} is not within 0.0001 of {expected}"
        );
    }

    #[test]
    fn weighted_mean_of_three_agents() {
        let market = market(&["a", "b", "c"]);
        let predictions = vec![
            prediction("a", dec!(0.73), dec!(0.85), Some(dec!(0.85))),
            prediction("b", dec!(0.68), dec!(0.78), Some(dec!(0.72))),
            prediction("c", dec!(0.82), dec!(0.71), Some(dec!(0.68))),
        ];

        let consensus = aggregator().aggregate(&market, &predictions, Utc::now()).unwrap();
        // (0.6205 + 0.4896 + 0.5576) / 2.25 and (0.7225 + 0.5616 + 0.4828) / 2.25
        approx(consensus.signal_strength, dec!(0.7412));
        approx(consensus.confidence, dec!(0.7853));
        assert_eq!(consensus.agent_count, 3);
        assert_eq!(consensus.asset, "BTC");
    }

    #[test]
    fn unknown_weight_defaults_to_one() {
        let market = market(&["a", "b", "c"]);
        let predictions = vec![
            prediction("a", dec!(0.2), dec!(0.6), None),
            prediction("b", dec!(0.6), dec!(0.8), None),
        ];
        let consensus = aggregator().aggregate(&market, &predictions, Utc::now()).unwrap();
        assert_eq!(consensus.signal_strength, dec!(0.4));
        assert_eq!(consensus.confidence, dec!(0.7));
        assert_eq!(consensus.agent_count, 2);
    }

    #[test]
    fn single_prediction_is_no_consensus() {
        let market = market(&["a", "b", "c"]);
        let predictions = vec![prediction("a", dec!(0.9), dec!(0.99), Some(dec!(1)))];
        assert!(aggregator().aggregate(&market, &predictions, Utc::now()).is_none());
    }

    #[test]
    fn too_few_participants_is_no_consensus() {
        let market = market(&["a", "b"]);
        let predictions = vec![
            prediction("a", dec!(0.9), dec!(0.9), Some(dec!(1))),
            prediction("b", dec!(0.9), dec!(0.9), Some(dec!(1))),
        ];
        assert!(aggregator().aggregate(&market, &predictions, Utc::now()).is_none());
    }

    #[test]
    fn zero_total_weight_is_no_consensus() {
        let market = market(&["a", "b", "c"]);
        let predictions = vec![
            prediction("a", dec!(0.9), dec!(0.9), Some(dec!(0))),
            prediction("b", dec!(0.8), dec!(0.9), Some(dec!(0))),
        ];
        assert!(aggregator().aggregate(&market, &predictions, Utc::now()).is_none());
    }

    #[test]
    fn overflowing_weights_are_no_consensus() {
        let market = market(&["a", "b", "c"]);
        let predictions = vec![
            prediction("a", dec!(0.73), dec!(0.85), Some(Decimal::MAX)),
            prediction("b", dec!(0.68), dec!(0.78), Some(Decimal::MAX)),
        ];
        assert!(aggregator().aggregate(&market, &predictions, Utc::now()).is_none());

        // Large but summable weights still aggregate
        let predictions = vec![
            prediction("a", dec!(0.5), dec!(0.8), Some(dec!(1000000000))),
            prediction("b", dec!(0.5), dec!(0.6), Some(dec!(1000000000))),
        ];
        let consensus = aggregator().aggregate(&market, &predictions, Utc::now()).unwrap();
        approx(consensus.signal_strength, dec!(0.5));
        approx(consensus.confidence, dec!(0.7));
    }

    #[test]
    fn invalid_and_foreign_predictions_are_skipped() {
        let market = market(&["a", "b", "c"]);
        let mut foreign = prediction("c", dec!(-1), dec!(1), Some(dec!(5)));
        foreign.market_id = "other".to_string();
        let predictions = vec![
            prediction("a", dec!(0.5), dec!(0.8), Some(dec!(1))),
            prediction("b", dec!(1.5), dec!(0.8), Some(dec!(1))), // out of range
            prediction("z", dec!(-0.9), dec!(0.9), Some(dec!(1))), // not a participant
            prediction("a", dec!(-0.9), dec!(0.9), Some(dec!(1))), // duplicate
            foreign,
            prediction("c", dec!(0.3), dec!(0.6), Some(dec!(1))),
        ];
        let consensus = aggregator().aggregate(&market, &predictions, Utc::now()).unwrap();
        assert_eq!(consensus.agent_count, 2);
        assert_eq!(consensus.signal_strength, dec!(0.4));
        assert_eq!(consensus.confidence, dec!(0.7));
    }

    #[test]
    fn results_are_convex_combinations() {
        let market = market(&["a", "b", "c", "d"]);
        let extremes = [
            (dec!(-1), dec!(0), dec!(0.1)),
            (dec!(1), dec!(1), dec!(3)),
            (dec!(-0.999), dec!(0.001), dec!(0.0001)),
            (dec!(0.333), dec!(0.777), dec!(7)),
        ];
        let agents = ["a", "b", "c", "d"];
        for take in 2..=extremes.len() {
            let predictions: Vec<_> = extremes[..take]
                .iter()
                .zip(agents)
                .map(|((s, c, w), agent)| prediction(agent, *s, *c, Some(*w)))
                .collect();
            let consensus = aggregator().aggregate(&market, &predictions, Utc::now()).unwrap();
            assert!(consensus.signal_strength >= dec!(-1) && consensus.signal_strength <= dec!(1));
            assert!(consensus.confidence >= dec!(0) && consensus.confidence <= dec!(1));
        }
    }

    #[test]
    fn aggregate_all_uses_snapshot_instant() {
        let market = market(&["a", "b", "c"]);
        let captured_at = Utc::now() - Duration::seconds(5);
        let mut snapshot = PredictionSnapshot::new(captured_at);
        snapshot.insert(
            &market.id,
            vec![
                prediction("a", dec!(0.5), dec!(0.8), None),
                prediction("b", dec!(0.5), dec!(0.8), None),
            ],
        );
        assert_eq!(snapshot.total_predictions(), 2);

        let results = aggregator().aggregate_all([&market], &snapshot);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].timestamp, captured_at);
    }
}
