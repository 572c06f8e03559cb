//! Scan pipeline integration tests

use crate::support::{line, FailingSink, FakeLines, FakeStats};
use chrono::NaiveDate;
use floor_scan::cache::{FetchError, FetchMode, QuotaAwareFetchCache};
use floor_scan::data::{MemorySink, ParquetOpportunitySink, ParquetReader};
use floor_scan::floor::{BoundKind, Stat, Subject, SubjectKind};
use floor_scan::lines::{AmericanOdds, LineEntry, Side};
use floor_scan::scan::{ScanConfig, ScanError, ScanPipeline};
use floor_scan::sources::LineFetch;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
}

fn values(raw: &[i64]) -> Vec<Decimal> {
    raw.iter().map(|v| Decimal::from(*v)).collect()
}

fn slate() -> Vec<LineEntry> {
    let brunson = Subject::player("Jalen Brunson");
    let hart = Subject::player("Josh Hart");
    let knicks = Subject::team("New York Knicks");
    vec![
        line(brunson.clone(), Stat::Points, Side::Over, dec!(10.5), -700),
        line(brunson.clone(), Stat::Points, Side::Over, dec!(11.5), -450),
        line(brunson, Stat::Points, Side::Over, dec!(12.5), -250),
        line(hart.clone(), Stat::Rebounds, Side::Over, dec!(5.5), -800),
        line(hart, Stat::Rebounds, Side::Over, dec!(6.5), 0),
        line(Subject::player("Nobody"), Stat::Points, Side::Over, dec!(10.5), -200),
        line(Subject::player("Bad Data"), Stat::Points, Side::Over, dec!(5.5), -300),
        line(knicks.clone(), Stat::TeamPoints, Side::Under, dec!(125.5), -350),
        line(knicks.clone(), Stat::TeamPoints, Side::Under, dec!(121.5), -200),
        line(knicks, Stat::TeamPoints, Side::Under, dec!(120.5), -110),
    ]
}

fn stats() -> FakeStats {
    FakeStats::default()
        .with("Jalen Brunson", Stat::Points, values(&[11, 12, 13, 14, 14, 15, 16, 18, 20, 22]))
        .with("Josh Hart", Stat::Rebounds, values(&[8, 9, 10, 9, 11, 12, 8, 10, 9, 10]))
        .with("Bad Data", Stat::Points, values(&[10, -1, 12]))
        .with(
            "New York Knicks",
            Stat::TeamPoints,
            values(&[110, 115, 118, 120, 121, 112, 108, 125, 119, 117]),
        )
}

#[tokio::test]
async fn test_full_scan() {
    let sink = MemorySink::new();
    let mut pipeline = ScanPipeline::new(
        ScanConfig::default(),
        FakeLines::new(slate()),
        stats(),
        sink.clone(),
    );

    let summary = pipeline.run(date()).await.unwrap();

    // Best price first
    assert_eq!(summary.opportunities.len(), 2);
    let knicks = &summary.opportunities[0];
    assert_eq!(knicks.subject, Subject::team("New York Knicks"));
    assert_eq!(knicks.side, Side::Under);
    assert_eq!(knicks.bound, BoundKind::Ceiling);
    assert_eq!(knicks.bound_value, dec!(121.4));
    assert_eq!(knicks.line, dec!(121.5));
    assert_eq!(knicks.price, AmericanOdds::new(-200));
    assert_eq!(knicks.hit_rate(), "9/10");

    let brunson = &summary.opportunities[1];
    assert_eq!(brunson.subject, Subject::player("Jalen Brunson"));
    assert_eq!(brunson.raw_percentile, dec!(11.9));
    assert_eq!(brunson.bound_value, dec!(12));
    assert_eq!(brunson.line, dec!(11.5));
    assert_eq!(brunson.price, AmericanOdds::new(-450));
    assert_eq!(brunson.hit_rate(), "9/10");

    let meta = &summary.metadata;
    assert_eq!(meta.scan_date, date());
    assert_eq!(meta.subjects_analyzed, 5);
    assert_eq!(meta.subjects_skipped, 3);
    assert_eq!(meta.skips.price_rejected, 1);
    assert_eq!(meta.skips.no_history, 1);
    assert_eq!(meta.skips.invalid_series, 1);
    assert_eq!(meta.skips.no_qualifying_line, 0);
    assert_eq!(meta.skips.malformed_lines, 1);
    assert_eq!(meta.player_picks, 1);
    assert_eq!(meta.team_picks, 1);
    assert_eq!(meta.quota_remaining, Some(19_990));
    assert_eq!(summary.picks(SubjectKind::Team).count(), 1);

    let runs = sink.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0.run_id, meta.run_id);
    assert_eq!(runs[0].1, summary.opportunities);
}

#[tokio::test]
async fn test_minimum_sample_gate() {
    let mut config = ScanConfig::default();
    config.matcher.min_sample_size = Some(12);
    let mut pipeline = ScanPipeline::new(config, FakeLines::new(slate()), stats(), MemorySink::new());

    let summary = pipeline.run(date()).await.unwrap();

    assert!(summary.opportunities.is_empty());
    // Subjects without a usable series are skipped before the gate
    assert_eq!(summary.metadata.skips.insufficient_sample, 3);
    assert_eq!(summary.metadata.skips.no_history, 1);
}

#[tokio::test]
async fn test_fetch_failure_aborts_without_recording() {
    let sink = MemorySink::new();
    let mut pipeline = ScanPipeline::new(
        ScanConfig::default(),
        FakeLines::failing(FetchError::QuotaExhausted),
        stats(),
        sink.clone(),
    );

    let err = pipeline.run(date()).await.unwrap_err();

    assert!(matches!(err, ScanError::Fetch(FetchError::QuotaExhausted)));
    assert!(sink.runs().await.is_empty());
    assert!(pipeline.line_cache().quota().exhausted());
}

#[tokio::test]
async fn test_sink_failure_is_persistence_error() {
    let mut pipeline = ScanPipeline::new(ScanConfig::default(), FakeLines::new(slate()), stats(), FailingSink);

    let err = pipeline.run(date()).await.unwrap_err();
    assert!(matches!(err, ScanError::Persistence(_)));
}

#[tokio::test]
async fn test_fresh_mode_refetches_each_run() {
    let lines = FakeLines::new(slate());
    let mut pipeline = ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), MemorySink::new());

    pipeline.run(date()).await.unwrap();
    pipeline.run(date()).await.unwrap();

    assert_eq!(lines.calls(), 2);
}

#[tokio::test]
async fn test_cached_mode_reuses_same_day_fetch() {
    let lines = FakeLines::new(slate());
    let config = ScanConfig {
        fetch_mode: FetchMode::Cached,
        ..ScanConfig::default()
    };
    let mut pipeline = ScanPipeline::new(config, lines.clone(), stats(), MemorySink::new());

    let first = pipeline.run(date()).await.unwrap();
    let second = pipeline.run(date()).await.unwrap();

    assert_eq!(lines.calls(), 1);
    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(first.opportunities.len(), second.opportunities.len());
}

#[tokio::test]
async fn test_snapshot_shared_between_processes() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("line_cache.json");
    let lines = FakeLines::new(slate());

    let mut first = ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), MemorySink::new());
    first.run(date()).await.unwrap();
    first.line_cache().save_snapshot(&snapshot).unwrap();

    // A fresh run ignores what the earlier process fetched
    let restored: QuotaAwareFetchCache<NaiveDate, LineFetch> =
        QuotaAwareFetchCache::load_snapshot(&snapshot).unwrap();
    let mut fresh = ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), MemorySink::new())
        .with_line_cache(restored);
    fresh.run(date()).await.unwrap();
    assert_eq!(lines.calls(), 2);

    // A cached run reuses it
    let restored: QuotaAwareFetchCache<NaiveDate, LineFetch> =
        QuotaAwareFetchCache::load_snapshot(&snapshot).unwrap();
    let config = ScanConfig {
        fetch_mode: FetchMode::Cached,
        ..ScanConfig::default()
    };
    let mut cached = ScanPipeline::new(config, lines.clone(), stats(), MemorySink::new())
        .with_line_cache(restored);
    let summary = cached.run(date()).await.unwrap();
    assert_eq!(lines.calls(), 2);
    assert_eq!(summary.opportunities.len(), 2);
    assert_eq!(summary.metadata.quota_remaining, Some(19_990));
}

#[tokio::test]
async fn test_parquet_output() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ParquetOpportunitySink::new(dir.path());
    let mut pipeline = ScanPipeline::new(ScanConfig::default(), FakeLines::new(slate()), stats(), sink.clone());

    let summary = pipeline.run(date()).await.unwrap();

    let written = ParquetReader::new(sink.file_path(&summary.metadata))
        .read_opportunities()
        .unwrap();
    assert_eq!(written.len(), summary.opportunities.len());
    for (read, emitted) in written.iter().zip(&summary.opportunities) {
        assert_eq!(read.id, emitted.id);
        assert_eq!(read.subject, emitted.subject);
        assert_eq!(read.line, emitted.line);
        assert_eq!(read.price, emitted.price);
        assert_eq!(read.bound_value, emitted.bound_value);
        assert_eq!(read.recent, emitted.recent);
    }
    assert_eq!(sink.run_history().unwrap(), vec![summary.metadata]);
}

#[tokio::test]
async fn test_quota_exhaustion_recovers_on_next_run() {
    let lines = FakeLines::new(slate());
    lines.fail_with(FetchError::QuotaExhausted);
    let sink = MemorySink::new();
    let mut pipeline = ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), sink.clone());

    let err = pipeline.run(date()).await.unwrap_err();
    assert!(matches!(err, ScanError::Fetch(FetchError::QuotaExhausted)));
    assert!(pipeline.line_cache().quota().exhausted());

    // The provider's budget resets; the next scan asks again
    lines.recover();
    let summary = pipeline.run(date()).await.unwrap();

    assert_eq!(lines.calls(), 2);
    assert_eq!(summary.opportunities.len(), 2);
    assert_eq!(summary.metadata.quota_remaining, Some(19_990));
    assert_eq!(sink.runs().await.len(), 1);
}

#[tokio::test]
async fn test_reported_zero_budget_does_not_block_later_runs() {
    let lines = FakeLines::new(slate()).reporting(Some(0));
    let mut pipeline = ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), MemorySink::new());

    let first = pipeline.run(date()).await.unwrap();
    assert_eq!(first.metadata.quota_remaining, Some(0));

    let next_day = date().succ_opt().unwrap();
    pipeline.run(next_day).await.unwrap();
    assert_eq!(lines.calls(), 2);
}

#[tokio::test]
async fn test_quota_exhaustion_recovers_through_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("line_cache.json");
    let lines = FakeLines::new(slate());
    lines.fail_with(FetchError::QuotaExhausted);

    let mut first = ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), MemorySink::new());
    first.run(date()).await.unwrap_err();
    first.line_cache().save_snapshot(&snapshot).unwrap();

    let restored: QuotaAwareFetchCache<NaiveDate, LineFetch> =
        QuotaAwareFetchCache::load_snapshot(&snapshot).unwrap();
    assert_eq!(restored.quota().remaining, Some(0));
    assert!(!restored.quota().exhausted());

    lines.recover();
    let mut next = ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), MemorySink::new())
        .with_line_cache(restored);
    let summary = next.run(date()).await.unwrap();

    assert_eq!(lines.calls(), 2);
    assert_eq!(summary.opportunities.len(), 2);
}
