//! Run scheduler module
//!
//! Idempotent once-a-day trigger over an injected run state store

mod runner;
mod store;
mod types;

pub use runner::{RunScheduler, ScanJob, SchedulerConfig};
pub use store::{InMemoryRunStateStore, JsonRunStateStore, RunStateStore, StoreError};
pub use types::{RunState, SchedulerError, SchedulerState, TickOutcome};
