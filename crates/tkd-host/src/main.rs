use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tkd_engine::{EventBus, MatchEngine, MatchService};
use tkd_host::{transport, HostConfig};

/// Taekwondo scoring host: JSON-lines commands on stdin, events on stdout
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with the starting match rules
    #[arg(long)]
    config: Option<PathBuf>,

    /// Round clock cadence in milliseconds (overrides TKD_TICK_MS)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Log filter such as "debug" or "tkd_engine=trace" (overrides RUST_LOG)
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the event stream
    let filter = match args.log_filter.as_deref() {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = HostConfig::default();
    if let Some(path) = &args.config {
        config = config
            .with_rules_file(path)
            .with_context(|| format!("Failed to load match rules from {}", path.display()))?;
    }
    if let Some(ms) = args.tick_ms {
        config = config.with_tick_ms(ms);
    }

    let mut engine = MatchEngine::new();
    if !config.match_rules.is_empty() {
        engine.configure(&config.match_rules);
    }
    info!(
        rounds = engine.config().rounds,
        round_duration = engine.config().round_duration,
        consensus = engine.config().consensus_enabled,
        tick_ms = config.tick_interval.as_millis() as u64,
        "Scoring host starting"
    );

    let bus = EventBus::new().shared();
    let (handle, task) = MatchService::spawn(engine, bus.clone(), config.tick_interval);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let served = transport::serve(stdin, &mut stdout, &handle, &bus).await;

    // already stopped if the transport saw the service close
    let _ = handle.shutdown().await;
    task.await.context("Match service task panicked")?;
    served.context("Stdio transport failed")?;

    info!("Scoring host stopped");
    Ok(())
}
