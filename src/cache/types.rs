//! Fetch cache types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a fetch may be served from earlier runs' cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Reuse only what this run fetched itself
    #[default]
    Fresh,
    /// Reuse anything fetched earlier the same calendar day
    Cached,
}

/// Typed failure from an external data source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure or unexpected HTTP status
    #[error("network error: {0}")]
    Network(String),
    /// Provider refused the request for lack of quota
    #[error("request quota exhausted")]
    QuotaExhausted,
    /// Response could not be parsed
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Source has nothing for the requested key
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return FetchError::MalformedResponse(err.to_string());
        }
        match err.status() {
            Some(status) if status == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                FetchError::QuotaExhausted
            }
            _ => FetchError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedResponse(err.to_string())
    }
}

/// Value returned by a live fetch, with the provider's quota report
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<V> {
    pub value: V,
    /// Remaining requests reported by the provider, if any
    pub remaining_quota: Option<u32>,
}

impl<V> Fetched<V> {
    /// Value from a source that does not meter requests
    pub fn unmetered(value: V) -> Self {
        Self {
            value,
            remaining_quota: None,
        }
    }

    pub fn with_quota(value: V, remaining_quota: Option<u32>) -> Self {
        Self {
            value,
            remaining_quota,
        }
    }
}

/// Running request accounting.
///
/// `remaining` is informational and survives snapshots. Live fetches are
/// only refused while the current run has seen the budget run out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    /// Last known remaining budget
    pub remaining: Option<u32>,
    /// Successful live fetches
    pub requests: u32,
    /// Failed live fetches (never charged)
    pub failures: u32,
    /// Fetches served from cache
    pub hits: u32,
    #[serde(skip)]
    spent_this_run: bool,
}

impl QuotaStatus {
    /// Whether the budget ran out during the current run
    pub fn exhausted(&self) -> bool {
        self.spent_this_run
    }

    /// Account for a successful live fetch
    pub fn charge(&mut self, reported: Option<u32>) {
        self.requests += 1;
        self.remaining = match reported {
            Some(remaining) => Some(remaining),
            None => self.remaining.map(|r| r.saturating_sub(1)),
        };
        if self.remaining == Some(0) {
            self.spent_this_run = true;
        }
    }

    /// Account for a failed live fetch
    pub fn fail(&mut self, err: &FetchError) {
        self.failures += 1;
        if matches!(err, FetchError::QuotaExhausted) {
            self.remaining = Some(0);
            self.spent_this_run = true;
        }
    }

    /// Allow live fetches again for a new run; the provider decides from here
    pub fn reopen(&mut self) {
        self.spent_this_run = false;
    }
}
