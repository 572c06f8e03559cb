//! Tick and daemon command implementations

use super::scan::{load_line_cache, save_line_cache};
use super::{build_pipeline, odds_client};
use crate::cache::FetchMode;
use crate::config::Config;
use crate::data::ParquetOpportunitySink;
use crate::scan::ScanPipeline;
use crate::scheduler::{JsonRunStateStore, RunScheduler};
use crate::sources::{GameLogStatsSource, OddsApiClient};
use chrono::{DateTime, Utc};
use clap::Args;

type ProductionScheduler = RunScheduler<
    OddsApiClient,
    JsonRunStateStore,
    ScanPipeline<OddsApiClient, GameLogStatsSource, ParquetOpportunitySink>,
>;

fn build_scheduler(config: &Config) -> anyhow::Result<ProductionScheduler> {
    let pipeline = build_pipeline(config, config.scan_config(FetchMode::Fresh))?
        .with_line_cache(load_line_cache(config));

    Ok(RunScheduler::new(
        config.scheduler_config(),
        odds_client(config)?,
        JsonRunStateStore::new(&config.scheduler.state_path),
        pipeline,
    ))
}

#[derive(Args, Debug)]
pub struct TickArgs {
    /// Evaluate as of this instant (RFC 3339), defaults to now
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,
}

impl TickArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut scheduler = build_scheduler(config)?;
        let outcome = scheduler.tick(self.now.unwrap_or_else(Utc::now)).await;
        save_line_cache(scheduler.job().line_cache(), config);

        let outcome = outcome?;
        println!("{}", outcome);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Override the configured tick interval (seconds)
    #[arg(long)]
    pub interval: Option<u64>,
}

impl DaemonArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(interval) = self.interval {
            config.scheduler.tick_interval_secs = interval;
        }

        let mut scheduler = build_scheduler(&config)?;
        scheduler
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            })
            .await;

        save_line_cache(scheduler.job().line_cache(), &config);
        Ok(())
    }
}
