use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use venue_models::config::TradingConfig;
use venue_models::prediction::MarketConsensus;
use venue_models::signal::{Direction, TradingSignal};

/// Turns consensus that clears the execution threshold into sized signals.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: TradingConfig,
}

impl SignalGenerator {
    pub fn new(config: TradingConfig) -> Self {
        Self { config }
    }

    /// `max_size * |strength| * confidence`, clamped to `[0.25 * max_size, max_size]`.
    pub fn position_size(&self, signal_strength: Decimal, confidence: Decimal) -> Decimal {
        let max_size = self.config.max_position_size;
        (max_size * signal_strength.abs() * confidence)
            .clamp(self.config.min_position_size(), max_size)
    }

    /// Convert one consensus. `None` when below threshold or without direction.
    pub fn signal_for(
        &self,
        consensus: &MarketConsensus,
        cycle: u64,
        now: DateTime<Utc>,
    ) -> Option<TradingSignal> {
        if consensus.confidence < self.config.execution_threshold {
            debug!(
                asset = %consensus.asset,
                confidence = %consensus.confidence,
                threshold = %self.config.execution_threshold,
                "Consensus below execution threshold"
            );
            return None;
        }
        if consensus.signal_strength.is_zero() {
            debug!(asset = %consensus.asset, "Consensus has no direction, not trading");
            return None;
        }

        let direction = if consensus.signal_strength > Decimal::ZERO {
            Direction::Long
        } else {
            Direction::Short
        };
        let size = self.position_size(consensus.signal_strength, consensus.confidence);
        let reasoning = format!(
            "Prediction consensus: signal {} with confidence {} from {} agents",
            consensus.signal_strength.round_dp(4),
            consensus.confidence.round_dp(4),
            consensus.agent_count
        );

        Some(TradingSignal {
            id: format!("pred-{}-c{}", consensus.asset, cycle),
            market_id: consensus.market_id.clone(),
            asset: consensus.asset.clone(),
            pair: self.config.pair_for(&consensus.asset),
            direction,
            size,
            confidence: consensus.confidence,
            signal_strength: consensus.signal_strength,
            agent_count: consensus.agent_count,
            reasoning,
            stop_loss: None,
            take_profit: None,
            created_at: now,
            expires_at: now + Duration::hours(self.config.signal_ttl_hours),
        })
    }

    /// Generate at most one signal per asset. When several markets on the same
    /// asset clear the threshold, the most confident consensus wins.
    pub fn generate(
        &self,
        consensus: &[MarketConsensus],
        cycle: u64,
        now: DateTime<Utc>,
    ) -> Vec<TradingSignal> {
        let mut by_asset: HashMap<&str, TradingSignal> = HashMap::new();
        for item in consensus {
            let Some(signal) = self.signal_for(item, cycle, now) else {
                continue;
            };
            match by_asset.get(item.asset.as_str()) {
                Some(existing) if !outranks(&signal, existing) => {
                    debug!(asset = %item.asset, market = %item.market_id, "Weaker consensus for asset dropped");
                }
                _ => {
                    by_asset.insert(item.asset.as_str(), signal);
                }
            }
        }

        let mut signals: Vec<TradingSignal> = by_asset.into_values().collect();
        signals.sort_by(|a, b| a.asset.cmp(&b.asset));
        for signal in &signals {
            info!(
                asset = %signal.asset,
                direction = %signal.direction,
                size = %signal.size,
                confidence = %signal.confidence,
                "Created trading signal"
            );
        }
        signals
    }
}

fn outranks(candidate: &TradingSignal, existing: &TradingSignal) -> bool {
    (candidate.confidence, candidate.signal_strength.abs())
        > (existing.confidence, existing.signal_strength.abs())
}
