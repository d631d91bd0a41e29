use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use venue_models::config::VenueConfig;

#[derive(Parser, Debug)]
#[command(
    name = "venue",
    about = "Prediction venue daemon - turns agent consensus into risk-checked paper trades"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/venue.toml")]
    config: String,

    /// Run a single cycle and print the metrics snapshot as JSON
    #[arg(long)]
    once: bool,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: VenueConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse venue config")?;

    let mut orchestrator =
        venue::build_orchestrator(&config).context("Failed to build orchestrator")?;

    if cli.once {
        let report = orchestrator.run_cycle().await;
        if let Some(error) = &report.error {
            tracing::warn!(error = %error, "Cycle did not complete");
        }
        let snapshot = orchestrator.state().snapshot(Utc::now());
        let output = if cli.pretty {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };
        println!("{output}");
        return Ok(());
    }

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    orchestrator.run().await;
    Ok(())
}
