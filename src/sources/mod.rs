//! External data sources
//!
//! Async seams for posted lines, historical performance and the event
//! schedule, plus the concrete adapters used by the binary.

mod game_log;
mod odds_api;

pub use game_log::{GameLogRecord, GameLogStatsSource};
pub use odds_api::{OddsApiClient, OddsApiConfig, ODDS_API_URL};

use crate::cache::{FetchError, Fetched};
use crate::floor::{Stat, Subject};
use crate::lines::LineCatalog;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything a line source returned for one calendar day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineFetch {
    pub catalog: LineCatalog,
    /// Events listed for the day
    pub events_scanned: usize,
    /// Events that produced at least one line
    pub events_with_lines: usize,
    /// Earliest start among the listed events
    pub first_event_start: Option<DateTime<Utc>>,
}

/// Source of posted alternate lines
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Fetch every alternate line posted for events on `date`
    async fn fetch_lines(&self, date: NaiveDate) -> Result<Fetched<LineFetch>, FetchError>;
}

/// Source of historical per-game observations
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Up to `lookback` most recent observations, oldest first.
    ///
    /// Returns `FetchError::NotFound` when the subject has no history.
    async fn fetch_series(
        &self,
        subject: &Subject,
        stat: Stat,
        lookback: usize,
    ) -> Result<Vec<Decimal>, FetchError>;
}

/// Source of event start times
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Start instants of every event on `date`
    async fn event_starts(&self, date: NaiveDate) -> Result<Vec<DateTime<Utc>>, FetchError>;
}
