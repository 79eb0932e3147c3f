//! Tick driver binary for the Agora simulation.
//!
//! Wires together the seed world, the step dispatcher, and the campaign
//! scanner into a periodic loop. The orchestration core is synchronous;
//! the async surface here is only the interval timer, ctrl-c handling,
//! and the optional `PostgreSQL` archive.
//!
//! # Startup sequence
//!
//! 1. Load configuration from `agora-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Seed the starting world (districts, citizens, demo campaign)
//! 4. Optionally connect the step archive
//! 5. Run the tick loop until `--ticks` is exhausted or ctrl-c

mod config;
mod driver;
mod error;
mod seed;

use std::path::{Path, PathBuf};
use std::time::Duration;

use agora_store::{MemoryStore, PostgresArchive, RecordStore};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::DriverConfig;
use crate::driver::{run_tick, run_tick_dry, terminal_steps};
use crate::error::DriverError;

/// Default configuration path, next to the workspace root.
const DEFAULT_CONFIG_PATH: &str = "agora-config.yaml";

/// Command-line options. Flags override the YAML config.
#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    ticks: Option<u64>,
    dry_run: bool,
}

fn parse_args() -> CliArgs {
    let mut args = CliArgs::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config_path = iter.next().map(PathBuf::from),
            "--ticks" => args.ticks = iter.next().and_then(|v| v.parse().ok()),
            "--dry-run" => args.dry_run = true,
            // Logging is not up yet during argument parsing.
            other => eprintln!("ignoring unknown argument: {other}"),
        }
    }
    args
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();
    let config_path = args
        .config_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config_found = config_path.exists();
    let mut config = load_config(&config_path)?;
    if let Some(ticks) = args.ticks {
        config.driver.max_ticks = ticks;
    }
    if args.dry_run {
        config.driver.dry_run = true;
    }

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("agora-driver starting");
    if !config_found {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        tick_interval_secs = config.driver.tick_interval_secs,
        max_ticks = config.driver.max_ticks,
        dry_run = config.driver.dry_run,
        archive_enabled = config.infrastructure.archive_enabled,
        "Configuration loaded"
    );

    let mut store = MemoryStore::new();
    let seeded = seed::seed_world(&mut store, &config.world, Utc::now())?;
    info!(
        citizens = seeded.citizens.len(),
        demo_campaign = ?seeded.campaign,
        "World seeded"
    );

    let archive = if config.infrastructure.archive_enabled {
        let archive = PostgresArchive::connect(&config.infrastructure.postgres_url).await?;
        archive.ensure_schema().await?;
        info!("Step archive connected");
        Some(archive)
    } else {
        None
    };

    let mut interval = tokio::time::interval(Duration::from_secs(
        config.driver.tick_interval_secs.max(1),
    ));
    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!(ticks_run = tick, "Interrupted, shutting down");
                break;
            }
        }

        tick = tick.saturating_add(1);
        let now = Utc::now();
        let report = if config.driver.dry_run {
            run_tick_dry(&store, now)?
        } else {
            run_tick(&mut store, now)?
        };
        info!(
            tick,
            steps_completed = report.dispatch.completed,
            campaigns_continuing = report.campaigns_continuing,
            "Tick dispatched"
        );

        if let Some(archive) = &archive {
            if !config.driver.dry_run {
                archive_tick(archive, &store, now).await?;
            }
        }

        if config.driver.max_ticks > 0 && tick >= config.driver.max_ticks {
            info!(ticks_run = tick, "Tick budget exhausted, stopping");
            break;
        }
    }

    Ok(())
}

/// Load the YAML config, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> Result<DriverConfig, DriverError> {
    if path.exists() {
        Ok(DriverConfig::from_file(path)?)
    } else {
        let mut config = DriverConfig::default();
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Push terminal steps and campaign snapshots to the archive.
async fn archive_tick(
    archive: &PostgresArchive,
    store: &MemoryStore,
    now: chrono::DateTime<Utc>,
) -> Result<(), DriverError> {
    let steps = terminal_steps(store);
    archive.archive_steps(&steps).await?;
    for campaign in store.active_campaigns() {
        archive.snapshot_campaign(&campaign, now).await?;
    }
    Ok(())
}
