//! Status and reset command implementations

use super::today;
use crate::config::Config;
use crate::data::ParquetOpportunitySink;
use crate::scheduler::{JsonRunStateStore, RunStateStore};
use chrono::NaiveDate;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Day to inspect (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Number of recent runs to list
    #[arg(long, default_value = "5")]
    pub recent: usize,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let date = self.date.unwrap_or_else(|| today(config));
        let store = JsonRunStateStore::new(&config.scheduler.state_path);

        println!("floor-scan status for {}", date);
        match store.load(date).await? {
            Some(state) if state.has_run => {
                println!("  State: ran");
                if let Some(ran_at) = state.ran_at {
                    println!("  Ran at: {}", ran_at);
                }
                if let Some(target) = state.target_time {
                    println!("  Target: {}", target);
                }
                if let Some(run_id) = state.run_id {
                    println!("  Run ID: {}", run_id);
                }
            }
            _ => println!("  State: not run"),
        }

        let history = ParquetOpportunitySink::new(&config.storage.output_dir).run_history()?;
        if !history.is_empty() {
            println!("Recent runs:");
            for run in history.iter().rev().take(self.recent) {
                println!(
                    "  {} {} {:?}: {} opportunities ({} player, {} team), quota {}",
                    run.scan_date,
                    run.run_id,
                    run.fetch_mode,
                    run.opportunities,
                    run.player_picks,
                    run.team_picks,
                    run.quota_remaining
                        .map(|q| q.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                );
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Day whose run marker to clear (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
}

impl ResetArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = JsonRunStateStore::new(&config.scheduler.state_path);
        if store.clear(self.date).await? {
            tracing::info!(date = %self.date, "Cleared run marker");
            println!("Cleared run marker for {}", self.date);
        } else {
            println!("No run marker for {}", self.date);
        }
        Ok(())
    }
}
