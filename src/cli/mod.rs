//! CLI interface for floor-scan
//!
//! Provides subcommands for:
//! - `scan`: Run a scan now
//! - `tick`: Evaluate the daily schedule once
//! - `daemon`: Tick on a fixed cadence until interrupted
//! - `status`: Show a day's run state and recent runs
//! - `reset`: Clear a day's run marker
//! - `config`: Show configuration

mod scan;
mod schedule;
mod state;

pub use scan::ScanArgs;
pub use schedule::{DaemonArgs, TickArgs};
pub use state::{ResetArgs, StatusArgs};

use crate::config::Config;
use crate::data::ParquetOpportunitySink;
use crate::scan::{ScanConfig, ScanPipeline};
use crate::sources::{GameLogStatsSource, OddsApiClient};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "floor-scan")]
#[command(about = "Percentile-floor scanner for alternate sports betting lines")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scan now
    Scan(ScanArgs),
    /// Evaluate the daily schedule once
    Tick(TickArgs),
    /// Tick on the configured cadence until Ctrl-C
    Daemon(DaemonArgs),
    /// Show run state for a day
    Status(StatusArgs),
    /// Clear a day's run marker so it can run again
    Reset(ResetArgs),
    /// Show configuration
    Config,
}

/// Today in the configured time zone
pub(crate) fn today(config: &Config) -> NaiveDate {
    Utc::now().with_timezone(&config.timezone()).date_naive()
}

/// Production pipeline writing to Parquet
pub(crate) fn build_pipeline(
    config: &Config,
    scan: ScanConfig,
) -> anyhow::Result<ScanPipeline<OddsApiClient, GameLogStatsSource, ParquetOpportunitySink>> {
    Ok(ScanPipeline::new(
        scan,
        odds_client(config)?,
        GameLogStatsSource::new(&config.stats.game_log_dir),
        ParquetOpportunitySink::new(&config.storage.output_dir),
    ))
}

pub(crate) fn odds_client(config: &Config) -> anyhow::Result<OddsApiClient> {
    if config.odds.api_key.is_empty() {
        tracing::warn!("No Odds API key configured; set ODDS_API_KEY");
    }
    Ok(OddsApiClient::new(config.odds_config())?)
}
