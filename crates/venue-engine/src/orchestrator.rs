use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use venue_models::config::VenueConfig;
use venue_models::prediction::AgentPrediction;
use venue_models::trade::ExecutionReport;
use venue_store::RecordSink;

use crate::collaborators::{AgentPool, ExecutionBackend, PredictionSource, PriceFeed};
use crate::consensus::{ConsensusAggregator, PredictionSnapshot};
use crate::error::VenueError;
use crate::execution::ExecutionBridge;
use crate::pricing::PriceOracle;
use crate::risk::RiskAssessor;
use crate::signals::SignalGenerator;
use crate::state::VenueState;

/// Where the orchestrator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    MarketRefresh,
    AgentCoordination,
    Aggregation,
    SignalGeneration,
    RiskAndExecution,
    Monitoring,
    MetricsUpdate,
    Sleeping,
    Terminated,
}

impl CyclePhase {
    /// The phase that follows on success. `Terminated` is absorbing.
    pub fn next(self) -> Self {
        match self {
            CyclePhase::Idle => CyclePhase::MarketRefresh,
            CyclePhase::MarketRefresh => CyclePhase::AgentCoordination,
            CyclePhase::AgentCoordination => CyclePhase::Aggregation,
            CyclePhase::Aggregation => CyclePhase::SignalGeneration,
            CyclePhase::SignalGeneration => CyclePhase::RiskAndExecution,
            CyclePhase::RiskAndExecution => CyclePhase::Monitoring,
            CyclePhase::Monitoring => CyclePhase::MetricsUpdate,
            CyclePhase::MetricsUpdate => CyclePhase::Sleeping,
            CyclePhase::Sleeping => CyclePhase::MarketRefresh,
            CyclePhase::Terminated => CyclePhase::Terminated,
        }
    }
}

/// The external systems the venue talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub price_feed: Arc<dyn PriceFeed>,
    pub backend: Arc<dyn ExecutionBackend>,
    pub predictions: Arc<dyn PredictionSource>,
    pub agents: Arc<dyn AgentPool>,
}

/// Outcome of a single cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    /// Every phase ran to the end.
    pub completed: bool,
    /// Shutdown was requested mid-cycle.
    pub cancelled: bool,
    pub failed_phase: Option<CyclePhase>,
    pub error: Option<String>,
    /// How long to sleep before the next cycle.
    pub next_sleep: Duration,
    pub consensus_count: usize,
    pub signals_generated: usize,
    pub execution: Option<ExecutionReport>,
}

enum Interrupt {
    Cancelled,
    Failed(VenueError),
}

impl From<VenueError> for Interrupt {
    fn from(e: VenueError) -> Self {
        Interrupt::Failed(e)
    }
}

/// Await `fut` unless shutdown is requested first.
async fn unless_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, Interrupt> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        out = fut => Ok(out),
    }
}

/// Drives the venue through its phases, one cycle at a time.
///
/// `run_cycle` takes `&mut self`, so two cycles can never overlap.
pub struct Orchestrator {
    config: VenueConfig,
    state: VenueState,
    phase: CyclePhase,
    prices: PriceOracle,
    predictions: Arc<dyn PredictionSource>,
    agents: Arc<dyn AgentPool>,
    aggregator: ConsensusAggregator,
    generator: SignalGenerator,
    bridge: ExecutionBridge,
    sinks: Vec<Arc<dyn RecordSink>>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: VenueConfig, collaborators: Collaborators) -> Self {
        let prices = PriceOracle::new(collaborators.price_feed, &config.prices, &config.cycle);
        let bridge = ExecutionBridge::new(
            collaborators.backend,
            RiskAssessor::new(config.effective_risk()),
            config.cycle.max_concurrent_executions,
        );
        Self {
            aggregator: ConsensusAggregator::new(&config.agents),
            generator: SignalGenerator::new(config.trading.clone()),
            state: VenueState::new(),
            phase: CyclePhase::Idle,
            prices,
            predictions: collaborators.predictions,
            agents: collaborators.agents,
            bridge,
            sinks: Vec::new(),
            cancel: CancellationToken::new(),
            config,
        }
    }

    pub fn with_sinks(mut self, sinks: Vec<Arc<dyn RecordSink>>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Returns a CancellationToken that can be used to trigger shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn state(&self) -> &VenueState {
        &self.state
    }

    /// Run until cancelled, then flush final metrics.
    pub async fn run(&mut self) {
        info!(
            interval_secs = self.config.cycle.cycle_interval_seconds,
            sinks = self.sinks.len(),
            "Venue orchestrator starting"
        );

        while !self.cancel.is_cancelled() {
            let report = self.run_cycle().await;
            if report.cancelled {
                break;
            }
            debug!(sleep_secs = report.next_sleep.as_secs(), "Sleeping until next cycle");
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(report.next_sleep) => {}
            }
        }

        self.shutdown();
    }

    /// Flush metrics one last time and enter the terminal phase.
    pub fn shutdown(&mut self) {
        if self.phase == CyclePhase::Terminated {
            return;
        }
        info!(cycle = self.state.cycle, "Venue orchestrator shutting down");
        self.write_sinks(Utc::now());
        self.phase = CyclePhase::Terminated;
    }

    /// Run every phase once. Never fails: a phase error ends the cycle early
    /// and shortens the next sleep to the error backoff.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.state.cycle += 1;
        let mut report = CycleReport {
            cycle: self.state.cycle,
            completed: false,
            cancelled: false,
            failed_phase: None,
            error: None,
            next_sleep: Duration::from_secs(self.config.cycle.cycle_interval_seconds),
            consensus_count: 0,
            signals_generated: 0,
            execution: None,
        };
        info!(cycle = report.cycle, markets = self.state.markets.len(), "Starting cycle");

        match self.run_phases(&mut report).await {
            Ok(()) => {
                report.completed = true;
                self.phase = CyclePhase::Sleeping;
                info!(
                    cycle = report.cycle,
                    consensus = report.consensus_count,
                    signals = report.signals_generated,
                    "Cycle complete"
                );
            }
            Err(Interrupt::Cancelled) => {
                report.cancelled = true;
                info!(cycle = report.cycle, phase = ?self.phase, "Cycle interrupted by shutdown");
            }
            Err(Interrupt::Failed(e)) => {
                error!(cycle = report.cycle, phase = ?self.phase, error = %e, "Cycle failed");
                report.failed_phase = Some(self.phase);
                report.error = Some(e.to_string());
                report.next_sleep = Duration::from_secs(self.config.cycle.error_backoff_seconds);
                self.phase = CyclePhase::Sleeping;
            }
        }
        report
    }

    async fn run_phases(&mut self, report: &mut CycleReport) -> Result<(), Interrupt> {
        let cancel = self.cancel.clone();

        self.phase = CyclePhase::MarketRefresh;
        let now = Utc::now();
        let refreshed = unless_cancelled(
            &cancel,
            self.state.markets.refresh(&self.config.markets, &self.prices, now),
        )
        .await?;
        debug!(expired = refreshed.expired, created = refreshed.created, "Markets refreshed");

        self.phase = CyclePhase::AgentCoordination;
        unless_cancelled(&cancel, self.coordinate_agents()).await??;

        self.phase = CyclePhase::Aggregation;
        let snapshot = unless_cancelled(&cancel, self.capture_snapshot()).await??;
        self.state.total_predictions += snapshot.total_predictions() as u64;
        self.state.consensus = self
            .aggregator
            .aggregate_all(self.state.markets.iter(), &snapshot);
        report.consensus_count = self.state.consensus.len();

        self.phase = CyclePhase::SignalGeneration;
        if cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        let signals = self
            .generator
            .generate(&self.state.consensus, self.state.cycle, Utc::now());
        report.signals_generated = signals.len();

        self.phase = CyclePhase::RiskAndExecution;
        if cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        let now = Utc::now();
        let (live, expired): (Vec<_>, Vec<_>) = signals
            .into_iter()
            .partition(|signal| !signal.is_expired(now));
        for signal in &expired {
            warn!(signal = %signal.id, asset = %signal.asset, "Dropping expired signal");
        }
        self.state.expired_signals += expired.len() as u64;
        // Not raced against the token: started attempts must complete.
        let execution = self
            .bridge
            .execute(live, &mut self.state.tracker, &cancel)
            .await;
        report.execution = Some(execution);
        if cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        self.phase = CyclePhase::Monitoring;
        let summary = unless_cancelled(
            &cancel,
            self.state.tracker.monitor_open_trades(&self.prices, Utc::now()),
        )
        .await?;
        debug!(
            updated = summary.updated,
            closed_profit = summary.closed_profit,
            closed_loss = summary.closed_loss,
            unpriced = summary.unpriced,
            "Open trades monitored"
        );

        self.phase = CyclePhase::MetricsUpdate;
        self.write_sinks(Utc::now());
        Ok(())
    }

    /// Top up under-staffed markets, then ask every market for fresh predictions.
    async fn coordinate_agents(&mut self) -> Result<(), VenueError> {
        let min_agents = self.config.agents.min_agents_per_market;
        let max_agents = self.config.agents.max_agents_per_market;
        let ids: Vec<String> = self.state.markets.iter().map(|m| m.id.clone()).collect();

        for id in ids {
            let Some(market) = self.state.markets.get(&id) else {
                continue;
            };
            let count = market.participant_count();
            if count < min_agents {
                let deployed = self.agents.deploy(market, min_agents - count).await?;
                if let Some(market) = self.state.markets.get_mut(&id) {
                    let added = market.add_participants(deployed, max_agents);
                    info!(
                        market = %id,
                        added,
                        participants = market.participant_count(),
                        "Deployed agents to market"
                    );
                }
            }

            if let Some(market) = self.state.markets.get(&id) {
                self.agents.trigger_predictions(market).await?;
            }
        }
        Ok(())
    }

    /// Fetch every market's predictions and stamp them with one instant.
    /// Any source failure fails the whole snapshot.
    async fn capture_snapshot(&self) -> Result<PredictionSnapshot, VenueError> {
        let captured_at = Utc::now();
        let source = &self.predictions;
        let fetched: Vec<(String, Result<Vec<AgentPrediction>, VenueError>)> =
            stream::iter(self.state.markets.iter())
                .map(|market| async move { (market.id.clone(), source.predictions(market).await) })
                .buffer_unordered(self.config.cycle.max_concurrent_markets.max(1))
                .collect()
                .await;

        let mut snapshot = PredictionSnapshot::new(captured_at);
        for (market_id, result) in fetched {
            snapshot.insert(&market_id, result?);
        }
        debug!(
            markets = self.state.markets.len(),
            predictions = snapshot.total_predictions(),
            "Captured prediction snapshot"
        );
        Ok(snapshot)
    }

    /// Persist metrics and the ledger to every sink. Failures are logged only.
    fn write_sinks(&mut self, now: DateTime<Utc>) {
        let snapshot = self.state.snapshot(now);
        let changed = self.state.tracker.take_changed();
        for sink in &self.sinks {
            if let Err(e) = sink.write_metrics(&snapshot) {
                warn!(sink = sink.name(), error = %e, "Failed to write metrics");
            }
            let trades = if sink.wants_full_ledger() {
                self.state.tracker.trades()
            } else if changed.is_empty() {
                continue;
            } else {
                changed.as_slice()
            };
            if let Err(e) = sink.write_trades(trades) {
                warn!(sink = sink.name(), error = %e, "Failed to write trades");
            }
        }
        info!(
            cycle = snapshot.cycle,
            total_signals = snapshot.metrics.total_signals,
            executed = snapshot.metrics.executed_trades,
            active_trades = snapshot.active_trades,
            accuracy = %snapshot.metrics.accuracy_rate.round_dp(4),
            "Metrics updated"
        );
    }
}
