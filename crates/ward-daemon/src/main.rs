//! WARD Daemon - validator-side delegation lifecycle service
//!
//! wardd provisions participation keys for new delegation contracts,
//! deposits them on the ledger, and terminates contracts whose keys went
//! unconfirmed, whose window expired, or whose terms were breached.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use ward_daemon::{telemetry, Daemon, Overrides, WardConfig};

/// WARD Daemon CLI
#[derive(Parser)]
#[command(name = "wardd")]
#[command(about = "WARD Daemon - Validator-side delegation lifecycle service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WARD_CONFIG")]
    config: Option<PathBuf>,

    /// Validator ad id
    #[arg(long)]
    validator_id: Option<u64>,

    /// Seconds between the starts of two cycles
    #[arg(long)]
    poll_period: Option<u64>,

    /// Call `goal` directly instead of through `algokit`
    #[arg(long)]
    goal_only: bool,

    /// Log level
    #[arg(long, env = "WARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "WARD_LOG_JSON")]
    json: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            validator_id: self.validator_id,
            poll_period_secs: self.poll_period,
            goal_only: self.goal_only,
            log_level: self.log_level.clone(),
            json: self.json,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = WardConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply(&cli.overrides());

    // Initialize tracing
    telemetry::init(&config.logging.level, config.logging.json);

    let daemon = Daemon::new(config).await.context("starting daemon")?;

    if cli.once {
        let report = daemon.run_once().await?;
        tracing::info!(
            round = report.round,
            provisioned = report.provisioned.len(),
            terminated = report.terminated.len(),
            "Single cycle complete"
        );
        return Ok(());
    }

    daemon.run().await?;
    Ok(())
}
