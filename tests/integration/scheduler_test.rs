//! Scheduler integration tests over a real scan pipeline

use crate::support::{line, serve_odds_api, FailingSink, FakeLines, FakeStats, FixedSchedule};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use floor_scan::cache::FetchError;
use floor_scan::data::MemorySink;
use floor_scan::floor::{Stat, Subject};
use floor_scan::lines::Side;
use floor_scan::scan::{ScanConfig, ScanPipeline};
use floor_scan::scheduler::{
    InMemoryRunStateStore, JsonRunStateStore, RunScheduler, RunState, RunStateStore,
    SchedulerConfig, SchedulerError, SchedulerState, StoreError, TickOutcome,
};
use floor_scan::sources::{OddsApiClient, OddsApiConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_test::assert_ok;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, h, m, 0).unwrap()
}

fn lines() -> FakeLines {
    FakeLines::new(vec![line(
        Subject::player("Jalen Brunson"),
        Stat::Points,
        Side::Over,
        dec!(11.5),
        -450,
    )])
}

fn stats() -> FakeStats {
    FakeStats::default().with(
        "Jalen Brunson",
        Stat::Points,
        [11, 12, 13, 14, 14, 15, 16, 18, 20, 22]
            .into_iter()
            .map(Decimal::from)
            .collect(),
    )
}

#[tokio::test]
async fn test_scheduled_scan_runs_once() {
    let sink = MemorySink::new();
    let pipeline = ScanPipeline::new(ScanConfig::default(), lines(), stats(), sink.clone());
    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![at(19, 0), at(21, 30)]),
        InMemoryRunStateStore::new(),
        pipeline,
    );

    assert_eq!(
        scheduler.tick(at(12, 0)).await.unwrap(),
        TickOutcome::Waiting { target: at(16, 0) }
    );
    assert!(sink.runs().await.is_empty());

    let outcome = assert_ok!(scheduler.tick(at(16, 0)).await);
    let TickOutcome::Ran { run_id, opportunities } = outcome else {
        panic!("expected a run, got {:?}", outcome);
    };
    assert_eq!(opportunities, 1);

    for hour in [16, 17, 20, 23] {
        assert_eq!(scheduler.tick(at(hour, 30)).await.unwrap(), TickOutcome::AlreadyRan);
    }

    let runs = sink.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0.run_id, run_id);

    let state = scheduler
        .store()
        .load(scheduler.today(at(16, 0)))
        .await
        .unwrap()
        .unwrap();
    assert!(state.has_run);
    assert_eq!(state.run_id, Some(run_id));
    assert_eq!(state.target_time, Some(at(16, 0)));
}

#[tokio::test]
async fn test_no_events_never_scans() {
    let sink = MemorySink::new();
    let pipeline = ScanPipeline::new(ScanConfig::default(), lines(), stats(), sink.clone());
    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![]),
        InMemoryRunStateStore::new(),
        pipeline,
    );

    for hour in [0, 8, 16, 23] {
        assert_eq!(scheduler.tick(at(hour, 0)).await.unwrap(), TickOutcome::NoEvents);
    }
    assert!(matches!(scheduler.state(), Some(SchedulerState::Idle { .. })));
    assert!(sink.runs().await.is_empty());
}

#[tokio::test]
async fn test_fetch_failure_leaves_day_unmarked() {
    let failing = FakeLines::failing(FetchError::Network("connection reset".to_string()));
    let pipeline = ScanPipeline::new(ScanConfig::default(), failing.clone(), stats(), MemorySink::new());
    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![at(19, 0)]),
        InMemoryRunStateStore::new(),
        pipeline,
    );

    for hour in [16, 17] {
        let outcome = scheduler.tick(at(hour, 0)).await.unwrap();
        assert!(matches!(outcome, TickOutcome::ScanFailed { .. }));
    }

    // Each tick retried the scan
    assert_eq!(failing.calls(), 2);
    let date = scheduler.today(at(16, 0));
    assert!(!scheduler.store().has_run(date).await.unwrap());
    assert!(matches!(scheduler.state(), Some(SchedulerState::RunPending { .. })));
}

#[tokio::test]
async fn test_persistence_failure_leaves_day_unmarked() {
    let pipeline = ScanPipeline::new(ScanConfig::default(), lines(), stats(), FailingSink);
    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![at(19, 0)]),
        InMemoryRunStateStore::new(),
        pipeline,
    );

    let outcome = scheduler.tick(at(16, 30)).await.unwrap();
    assert!(matches!(outcome, TickOutcome::ScanFailed { .. }));
    assert!(!scheduler.store().has_run(scheduler.today(at(16, 30))).await.unwrap());
}

#[tokio::test]
async fn test_run_marker_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("run_state.json");
    let first_lines = lines();

    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![at(19, 0)]),
        JsonRunStateStore::new(&state_path),
        ScanPipeline::new(ScanConfig::default(), first_lines.clone(), stats(), MemorySink::new()),
    );
    assert!(matches!(scheduler.tick(at(16, 0)).await.unwrap(), TickOutcome::Ran { .. }));

    assert!(assert_ok!(scheduler.store().has_run(scheduler.today(at(16, 0))).await));

    // A new process sees the marker and does not scan again
    let second_lines = lines();
    let mut restarted = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![at(19, 0)]),
        JsonRunStateStore::new(&state_path),
        ScanPipeline::new(ScanConfig::default(), second_lines.clone(), stats(), MemorySink::new()),
    );
    assert_eq!(restarted.tick(at(17, 0)).await.unwrap(), TickOutcome::AlreadyRan);
    assert_eq!(second_lines.calls(), 0);

    // Operator reset allows one more run
    let store = JsonRunStateStore::new(&state_path);
    assert!(store.clear(restarted.today(at(17, 0))).await.unwrap());
    assert!(matches!(restarted.tick(at(17, 5)).await.unwrap(), TickOutcome::Ran { .. }));
    assert_eq!(second_lines.calls(), 1);
}

#[tokio::test]
async fn test_daemon_recovers_next_day_after_budget_runs_out() {
    let lines = lines().reporting(Some(0));
    let sink = MemorySink::new();
    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![at(19, 0)]),
        InMemoryRunStateStore::new(),
        ScanPipeline::new(ScanConfig::default(), lines.clone(), stats(), sink.clone()),
    );

    assert!(matches!(scheduler.tick(at(16, 0)).await.unwrap(), TickOutcome::Ran { .. }));

    let next_day = Utc.with_ymd_and_hms(2025, 11, 4, 16, 0, 0).unwrap();
    let outcome = assert_ok!(scheduler.tick(next_day).await);
    assert!(matches!(outcome, TickOutcome::Ran { .. }), "got {:?}", outcome);
    assert_eq!(lines.calls(), 2);
    assert_eq!(sink.runs().await.len(), 2);
}

#[tokio::test]
async fn test_provider_outage_leaves_day_unmarked() {
    let client = OddsApiClient::new(OddsApiConfig {
        base_url: serve_odds_api("503 Service Unavailable").await,
        api_key: "test-key".to_string(),
        request_delay: std::time::Duration::ZERO,
        ..OddsApiConfig::default()
    })
    .unwrap();
    let sink = MemorySink::new();
    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        client.clone(),
        InMemoryRunStateStore::new(),
        ScanPipeline::new(ScanConfig::default(), client, stats(), sink.clone()),
    );

    let outcome = assert_ok!(scheduler.tick(at(16, 0)).await);
    assert!(matches!(outcome, TickOutcome::ScanFailed { .. }), "got {:?}", outcome);
    assert!(!scheduler.store().has_run(scheduler.today(at(16, 0))).await.unwrap());
    assert!(sink.runs().await.is_empty());
}

/// Store that reads as empty and refuses writes
struct ReadOnlyStore;

#[async_trait]
impl RunStateStore for ReadOnlyStore {
    async fn load(&self, _date: NaiveDate) -> Result<Option<RunState>, StoreError> {
        Ok(None)
    }

    async fn mark_ran(&self, _state: RunState) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only state directory",
        )))
    }

    async fn clear(&self, _date: NaiveDate) -> Result<bool, StoreError> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_unmarked_run_names_recorded_run() {
    let sink = MemorySink::new();
    let mut scheduler = RunScheduler::new(
        SchedulerConfig::default(),
        FixedSchedule(vec![at(19, 0)]),
        ReadOnlyStore,
        ScanPipeline::new(ScanConfig::default(), lines(), stats(), sink.clone()),
    );

    let err = scheduler.tick(at(16, 0)).await.unwrap_err();
    let SchedulerError::Unmarked { run_id, .. } = err else {
        panic!("expected an unmarked run, got {:?}", err);
    };

    let runs = sink.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0.run_id, run_id);
}
