//! Scan command implementation

use super::{odds_client, today};
use crate::cache::{FetchMode, QuotaAwareFetchCache};
use crate::config::Config;
use crate::data::{MemorySink, OpportunitySink, ParquetOpportunitySink};
use crate::scan::{RunSummary, ScanPipeline};
use crate::sources::{GameLogStatsSource, LineFetch, LineSource, StatsSource};
use chrono::NaiveDate;
use clap::Args;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Reuse lines fetched earlier today instead of spending quota
    #[arg(long)]
    pub cached: bool,

    /// Date to scan (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Print results without writing output files
    #[arg(long)]
    pub dry_run: bool,

    /// Output format: json or table
    #[arg(long, default_value = "table")]
    pub format: String,
}

impl ScanArgs {
    pub fn fetch_mode(&self) -> FetchMode {
        if self.cached {
            FetchMode::Cached
        } else {
            FetchMode::Fresh
        }
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let date = self.date.unwrap_or_else(|| today(config));
        let scan = config.scan_config(self.fetch_mode());
        let lines = odds_client(config)?;
        let stats = GameLogStatsSource::new(&config.stats.game_log_dir);
        let cache = load_line_cache(config);

        let summary = if self.dry_run {
            let pipeline = ScanPipeline::new(scan, lines, stats, MemorySink::new());
            run_and_snapshot(pipeline.with_line_cache(cache), date, config).await?
        } else {
            let sink = ParquetOpportunitySink::new(&config.storage.output_dir);
            let pipeline = ScanPipeline::new(scan, lines, stats, sink);
            run_and_snapshot(pipeline.with_line_cache(cache), date, config).await?
        };

        match self.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
            _ => println!("{}", summary.format_table()),
        }
        Ok(())
    }
}

async fn run_and_snapshot<L, S, O>(
    mut pipeline: ScanPipeline<L, S, O>,
    date: NaiveDate,
    config: &Config,
) -> anyhow::Result<RunSummary>
where
    L: LineSource,
    S: StatsSource,
    O: OpportunitySink,
{
    let result = pipeline.run(date).await;
    save_line_cache(pipeline.line_cache(), config);
    Ok(result?)
}

/// Line cache from the last snapshot, or an empty one
pub(crate) fn load_line_cache(config: &Config) -> QuotaAwareFetchCache<NaiveDate, LineFetch> {
    let path = &config.storage.cache_path;
    if !path.exists() {
        return QuotaAwareFetchCache::new();
    }

    match QuotaAwareFetchCache::load_snapshot(path) {
        Ok(mut cache) => {
            cache.purge_before(today(config));
            cache
        }
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Ignoring unreadable line cache snapshot");
            QuotaAwareFetchCache::new()
        }
    }
}

pub(crate) fn save_line_cache(cache: &QuotaAwareFetchCache<NaiveDate, LineFetch>, config: &Config) {
    if let Err(e) = cache.save_snapshot(&config.storage.cache_path) {
        tracing::warn!(path = ?config.storage.cache_path, error = %e, "Failed to save line cache snapshot");
    }
}
