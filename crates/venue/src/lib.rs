//! Prediction venue: agent consensus in, risk-checked trades out.
//!
//! Each cycle refreshes prediction markets, staffs them with agents,
//! aggregates their predictions into a reputation-weighted consensus and
//! executes the signals that clear the confidence threshold.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use venue::models::config::VenueConfig;
//! use venue::engine::{Orchestrator, Collaborators};
//! use venue::store::{JsonFileSink, SqliteJournal};
//! ```

pub use venue_engine as engine;
pub use venue_models as models;
pub use venue_store as store;

pub mod paper;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use venue_engine::{Collaborators, Orchestrator, PriceFeed};
use venue_models::config::VenueConfig;
use venue_store::{JsonFileSink, RecordSink, SqliteJournal};

use crate::paper::{FilePredictionSource, PaperBackend, StaticAgentPool, StaticPriceFeed};

/// Wire the paper collaborators.
pub fn paper_collaborators(config: &VenueConfig) -> Collaborators {
    let price_feed: Arc<dyn PriceFeed> =
        Arc::new(StaticPriceFeed::new(config.prices.default_prices.clone()));
    Collaborators {
        backend: Arc::new(PaperBackend::new(price_feed.clone(), config.paper.capital)),
        predictions: Arc::new(FilePredictionSource::new(&config.paper.predictions_path)),
        agents: Arc::new(StaticAgentPool::new(config.agents.pool.clone())),
        price_feed,
    }
}

/// Open every sink named in the persistence section.
pub fn build_sinks(config: &VenueConfig) -> Result<Vec<Arc<dyn RecordSink>>, anyhow::Error> {
    let persistence = &config.persistence;
    let mut sinks: Vec<Arc<dyn RecordSink>> = Vec::new();

    if persistence.metrics_path.is_some() || persistence.signals_path.is_some() {
        sinks.push(Arc::new(JsonFileSink::new(
            persistence.metrics_path.as_ref().map(PathBuf::from),
            persistence.signals_path.as_ref().map(PathBuf::from),
        )));
    }
    if let Some(path) = &persistence.sqlite_path {
        let journal = SqliteJournal::open(path)
            .with_context(|| format!("Failed to open journal DB: {path}"))?;
        sinks.push(Arc::new(journal));
    }
    Ok(sinks)
}

/// Build an Orchestrator with paper collaborators from configuration.
pub fn build_orchestrator(config: &VenueConfig) -> Result<Orchestrator, anyhow::Error> {
    let sinks = build_sinks(config)?;
    Ok(Orchestrator::new(config.clone(), paper_collaborators(config)).with_sinks(sinks))
}
