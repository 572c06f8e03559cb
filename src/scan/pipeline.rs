//! End-to-end scan: lines, series, bounds, matching, persistence

use super::{RunMetadata, RunSummary, ScanError};
use crate::cache::{FetchError, FetchMode, Fetched, QuotaAwareFetchCache};
use crate::data::OpportunitySink;
use crate::floor::{FloorCalculator, PerformanceSeries, Stat, Subject, SubjectKind, DEFAULT_PERCENTILE};
use crate::lines::{LineEntry, LineKey};
use crate::matcher::{MatchOutcome, MatcherConfig, OpportunityMatcher, SkipCounters, SkipReason};
use crate::sources::{LineFetch, LineSource, StatsSource};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

/// Default number of most recent games per series
pub const DEFAULT_LOOKBACK: usize = 10;

type SeriesKey = (Subject, Stat, usize);

/// Configuration for a scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Most recent games considered per subject
    pub lookback: usize,
    /// Percentile threshold for bounds
    pub percentile: Decimal,
    pub matcher: MatcherConfig,
    /// Whether earlier runs' fetches may be reused
    pub fetch_mode: FetchMode,
    /// Time zone defining the calendar day for cache reuse
    pub timezone: Tz,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            percentile: DEFAULT_PERCENTILE,
            matcher: MatcherConfig::default(),
            fetch_mode: FetchMode::Fresh,
            timezone: Tz::UTC,
        }
    }
}

/// Runs scans against injected sources and a sink
pub struct ScanPipeline<L, S, O> {
    config: ScanConfig,
    lines: L,
    stats: S,
    sink: O,
    calculator: FloorCalculator,
    matcher: OpportunityMatcher,
    line_cache: QuotaAwareFetchCache<NaiveDate, LineFetch>,
    series_cache: QuotaAwareFetchCache<SeriesKey, Vec<Decimal>>,
}

impl<L, S, O> ScanPipeline<L, S, O>
where
    L: LineSource,
    S: StatsSource,
    O: OpportunitySink,
{
    pub fn new(config: ScanConfig, lines: L, stats: S, sink: O) -> Self {
        let calculator = FloorCalculator::new(config.percentile);
        let matcher = OpportunityMatcher::new(config.matcher.clone());
        Self {
            config,
            lines,
            stats,
            sink,
            calculator,
            matcher,
            line_cache: QuotaAwareFetchCache::new(),
            series_cache: QuotaAwareFetchCache::new(),
        }
    }

    /// Use a line cache restored from a snapshot
    pub fn with_line_cache(mut self, cache: QuotaAwareFetchCache<NaiveDate, LineFetch>) -> Self {
        self.line_cache = cache;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn line_cache(&self) -> &QuotaAwareFetchCache<NaiveDate, LineFetch> {
        &self.line_cache
    }

    pub fn sink(&self) -> &O {
        &self.sink
    }

    /// Scan every line posted for events on `date`.
    ///
    /// Per-subject problems are counted as skips. Fetch and persistence
    /// failures abort the scan.
    pub async fn run(&mut self, date: NaiveDate) -> Result<RunSummary, ScanError> {
        let started_at = Utc::now();
        let run_id = self.line_cache.begin_run();
        self.series_cache.begin_run();
        let mode = self.config.fetch_mode;
        let today = started_at.with_timezone(&self.config.timezone).date_naive();

        tracing::info!(run_id = %run_id, date = %date, mode = ?mode, "Starting scan");

        let line_source = &self.lines;
        let fetch = self
            .line_cache
            .get_or_fetch(date, mode, today, || line_source.fetch_lines(date))
            .await?;

        let quota_remaining = self.line_cache.quota().remaining;
        if let Some(remaining) = quota_remaining {
            telemetry::set_gauge(GaugeMetric::QuotaRemaining, f64::from(remaining));
        }

        let mut skips = SkipCounters::default();
        let mut opportunities = Vec::new();
        let groups = fetch.catalog.grouped();

        for (key, entries) in &groups {
            match self.evaluate_group(key, entries, mode, today, &mut skips).await? {
                MatchOutcome::Emit(opportunity) => {
                    tracing::info!(
                        subject = %opportunity.subject,
                        stat = %opportunity.stat,
                        side = %opportunity.side,
                        line = %opportunity.line,
                        price = %opportunity.price,
                        bound = %opportunity.bound_value,
                        hit_rate = %opportunity.hit_rate(),
                        "Opportunity found"
                    );
                    opportunities.push(opportunity);
                }
                MatchOutcome::Skip(reason) => {
                    tracing::debug!(
                        subject = %key.subject,
                        stat = %key.stat,
                        side = %key.side,
                        reason = reason.label(),
                        "Skipped"
                    );
                    telemetry::increment_labeled(CounterMetric::Skips, "reason", reason.label());
                    skips.record(&reason);
                }
            }
        }

        opportunities.sort_by(|a, b| {
            b.price
                .cmp(&a.price)
                .then_with(|| a.subject.cmp(&b.subject))
                .then_with(|| a.stat.cmp(&b.stat))
        });

        let player_picks = opportunities
            .iter()
            .filter(|o| o.subject_kind() == SubjectKind::Player)
            .count();
        let metadata = RunMetadata {
            run_id,
            scan_date: date,
            fetch_mode: mode,
            subjects_analyzed: groups.len(),
            subjects_skipped: skips.total() as usize,
            opportunities: opportunities.len(),
            player_picks,
            team_picks: opportunities.len() - player_picks,
            skips,
            quota_remaining,
            events_scanned: fetch.events_scanned,
            events_with_lines: fetch.events_with_lines,
            first_event_start: fetch.first_event_start,
            started_at,
            finished_at: Utc::now(),
        };

        self.sink.record_run(&metadata, &opportunities).await?;

        telemetry::increment(CounterMetric::Scans, 1);
        telemetry::increment(CounterMetric::Opportunities, opportunities.len() as u64);
        telemetry::increment(CounterMetric::MalformedLines, u64::from(metadata.skips.malformed_lines));
        telemetry::set_gauge(GaugeMetric::LastScanOpportunities, opportunities.len() as f64);

        tracing::info!(
            run_id = %run_id,
            analyzed = metadata.subjects_analyzed,
            skipped = metadata.subjects_skipped,
            opportunities = metadata.opportunities,
            player_picks = metadata.player_picks,
            team_picks = metadata.team_picks,
            quota_remaining = ?quota_remaining,
            "Scan complete"
        );

        Ok(RunSummary {
            metadata,
            opportunities,
        })
    }

    async fn evaluate_group(
        &mut self,
        key: &LineKey,
        entries: &[LineEntry],
        mode: FetchMode,
        today: NaiveDate,
        skips: &mut SkipCounters,
    ) -> Result<MatchOutcome, ScanError> {
        let observations = match self.observations(&key.subject, key.stat, mode, today).await {
            Ok(observations) => observations,
            Err(FetchError::NotFound(_)) => return Ok(MatchOutcome::Skip(SkipReason::NoHistory)),
            Err(e) => return Err(e.into()),
        };

        let series = match PerformanceSeries::new(key.subject.clone(), key.stat, observations) {
            Ok(series) => series,
            Err(e) => return Ok(MatchOutcome::Skip(SkipReason::InvalidSeries(e.to_string()))),
        };

        let estimate = self.calculator.estimate(&series, key.side);
        let evaluation = self.matcher.evaluate(&estimate, &series, entries, Utc::now());
        skips.malformed_lines += evaluation.malformed_lines as u32;

        Ok(evaluation.outcome)
    }

    /// Observations for a subject, shared between its over and under groups
    async fn observations(
        &mut self,
        subject: &Subject,
        stat: Stat,
        mode: FetchMode,
        today: NaiveDate,
    ) -> Result<Vec<Decimal>, FetchError> {
        let lookback = self.config.lookback;
        let stats = &self.stats;
        self.series_cache
            .get_or_fetch((subject.clone(), stat, lookback), mode, today, || async move {
                stats
                    .fetch_series(subject, stat, lookback)
                    .await
                    .map(Fetched::unmetered)
            })
            .await
    }
}
