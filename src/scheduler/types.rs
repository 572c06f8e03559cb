//! Scheduler state types

use super::StoreError;
use crate::cache::FetchError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Per-day scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No events today, or not yet evaluated
    Idle { date: NaiveDate },
    /// Events exist; waiting for the trigger time
    RunPending {
        date: NaiveDate,
        target: DateTime<Utc>,
    },
    /// Today's run completed
    Ran { date: NaiveDate },
}

impl SchedulerState {
    pub fn date(&self) -> NaiveDate {
        match self {
            SchedulerState::Idle { date }
            | SchedulerState::RunPending { date, .. }
            | SchedulerState::Ran { date } => *date,
        }
    }
}

/// Persisted per-day run marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub date: NaiveDate,
    pub has_run: bool,
    /// Trigger instant the run was scheduled for
    pub target_time: Option<DateTime<Utc>>,
    pub ran_at: Option<DateTime<Utc>>,
    pub run_id: Option<Uuid>,
}

impl RunState {
    /// Marker for a completed run
    pub fn ran(date: NaiveDate, target_time: DateTime<Utc>, ran_at: DateTime<Utc>, run_id: Uuid) -> Self {
        Self {
            date,
            has_run: true,
            target_time: Some(target_time),
            ran_at: Some(ran_at),
            run_id: Some(run_id),
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Today's run already happened
    AlreadyRan,
    /// No events scheduled today
    NoEvents,
    /// Trigger time not reached
    Waiting { target: DateTime<Utc> },
    /// Scan ran and was marked complete
    Ran { run_id: Uuid, opportunities: usize },
    /// Scan failed; today stays unmarked for the next tick
    ScanFailed {
        target: DateTime<Utc>,
        error: String,
    },
}

impl TickOutcome {
    /// Stable label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::AlreadyRan => "already_ran",
            TickOutcome::NoEvents => "no_events",
            TickOutcome::Waiting { .. } => "waiting",
            TickOutcome::Ran { .. } => "ran",
            TickOutcome::ScanFailed { .. } => "scan_failed",
        }
    }
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::AlreadyRan => write!(f, "already ran today"),
            TickOutcome::NoEvents => write!(f, "no events today"),
            TickOutcome::Waiting { target } => write!(f, "waiting until {}", target),
            TickOutcome::Ran { run_id, opportunities } => {
                write!(f, "ran {} ({} opportunities)", run_id, opportunities)
            }
            TickOutcome::ScanFailed { target, error } => {
                write!(f, "scan for target {} failed: {}", target, error)
            }
        }
    }
}

/// Tick failure outside the scan itself
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("schedule lookup failed: {0}")]
    Schedule(#[from] FetchError),
    #[error("run state store failed: {0}")]
    Store(#[from] StoreError),
    /// The scan was recorded but the day could not be marked; the next tick
    /// scans again and records a second run for `date`
    #[error("run {run_id} for {date} was recorded but not marked: {source}")]
    Unmarked {
        date: NaiveDate,
        run_id: Uuid,
        source: StoreError,
    },
}
