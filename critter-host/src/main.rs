//! Critter host.
//!
//! Stands in for the device firmware's outer loop: loads configuration,
//! restores the creature from disk, ticks it on a fixed interval, autosaves,
//! and saves once more on shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use critter_core::persistence::LoadOutcome;
use critter_core::{Agent, Clock, CritterConfig, MonotonicClock};
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file (overrides `persistence.state_path`).
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Stop after this many ticks (overrides `host.max_steps`).
    #[arg(short = 'n', long)]
    ticks: Option<u64>,

    /// Milliseconds between ticks (overrides `host.tick_interval_ms`).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Ignore any saved snapshot and start a fresh creature.
    #[arg(long)]
    fresh: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<CritterConfig> {
    match path {
        Some(p) => CritterConfig::from_file(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(CritterConfig::default()),
    }
}

fn save(agent: &Mutex<Agent>, path: &Path) {
    if let Err(e) = agent.lock().save_to(path) {
        error!(path = %path.display(), error = %e, "Save failed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    init_tracing(&config.general.log_level, args.json_logs || config.general.json_logs);

    if let Some(ms) = args.interval_ms {
        config.host.tick_interval_ms = ms;
    }
    if args.ticks.is_some() {
        config.host.max_steps = args.ticks;
    }
    let state_path = args
        .state
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.persistence.state_path));
    let host = config.host.clone();

    let mut agent = Agent::new(config).context("building agent")?;
    if args.fresh {
        info!("Starting fresh, snapshot ignored");
    } else {
        match agent.load_from(&state_path) {
            Ok(LoadOutcome::FirstRun) => info!(path = %state_path.display(), "First run"),
            Ok(LoadOutcome::Restored { step_count, payload_len }) => {
                info!(step_count, payload_len, "Resumed saved creature");
            }
            Err(e) => warn!(error = %e, "Snapshot unreadable, starting fresh"),
        }
    }
    let agent = Arc::new(Mutex::new(agent));
    let clock = MonotonicClock::new();

    let mut ticker = tokio::time::interval(Duration::from_millis(host.tick_interval_ms.max(1)));
    let autosave_period = Duration::from_secs(host.autosave_interval_secs.max(1));
    let mut autosave = tokio::time::interval_at(tokio::time::Instant::now() + autosave_period, autosave_period);
    let mut ticks: u64 = 0;

    info!(
        interval_ms = host.tick_interval_ms,
        autosave_secs = host.autosave_interval_secs,
        max_steps = ?host.max_steps,
        "Host loop started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let action = agent.lock().update(clock.now_ms());
                ticks += 1;
                info!(tick = ticks, %action, "Tick");
                if host.max_steps.is_some_and(|max| ticks >= max) {
                    break;
                }
            }
            _ = autosave.tick(), if host.autosave_interval_secs > 0 => {
                let agent = Arc::clone(&agent);
                let path = state_path.clone();
                tokio::task::spawn_blocking(move || save(&agent, &path))
                    .await
                    .context("autosave task panicked")?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    save(&agent, &state_path);
    let status = agent.lock().status();
    match status.to_json() {
        Ok(json) => info!(status = %json, "Final status"),
        Err(e) => warn!(error = %e, "Status export failed"),
    }
    Ok(())
}
