use std::collections::HashMap;

use rust_decimal::Decimal;
use venue_models::config::{RiskConfig, TradingConfig};
use venue_models::risk::RiskDecision;
use venue_models::signal::TradingSignal;

/// Count of open positions per asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exposure {
    open_by_asset: HashMap<String, usize>,
}

impl Exposure {
    pub fn open_positions(&self, asset: &str) -> usize {
        self.open_by_asset.get(asset).copied().unwrap_or(0)
    }

    pub fn add(&mut self, asset: &str) {
        *self.open_by_asset.entry(asset.to_string()).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.open_by_asset.values().sum()
    }
}

impl<'a> FromIterator<&'a str> for Exposure {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut exposure = Exposure::default();
        for asset in iter {
            exposure.add(asset);
        }
        exposure
    }
}

/// Approves or rejects signals against exposure and size limits.
///
/// Pure: the decision depends only on the signal, the exposure passed in
/// and the configuration.
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    config: RiskConfig,
    max_position_size: Decimal,
}

impl RiskAssessor {
    /// An unset size limit falls back to the default sizing cap. Use
    /// `VenueConfig::effective_risk` to inherit the configured one.
    pub fn new(config: RiskConfig) -> Self {
        let max_position_size = config
            .max_position_size
            .unwrap_or_else(|| TradingConfig::default().max_position_size);
        Self {
            config,
            max_position_size,
        }
    }

    pub fn assess(&self, signal: &TradingSignal, exposure: &Exposure) -> RiskDecision {
        let open = exposure.open_positions(&signal.asset);
        if open >= self.config.max_positions {
            return RiskDecision::reject(format!(
                "Maximum exposure reached for {}: {}/{}",
                signal.asset, open, self.config.max_positions
            ));
        }

        if signal.size > self.max_position_size {
            return RiskDecision::reject(format!(
                "Position size {} exceeds limit {}",
                signal.size, self.max_position_size
            ));
        }

        RiskDecision::approve(self.config.stop_loss, self.config.take_profit)
    }
}
