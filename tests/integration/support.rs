//! Fakes shared by the integration tests

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use floor_scan::cache::{FetchError, Fetched};
use floor_scan::data::{OpportunitySink, SinkError};
use floor_scan::floor::{Stat, Subject};
use floor_scan::lines::{AmericanOdds, LineEntry, Side};
use floor_scan::matcher::Opportunity;
use floor_scan::scan::RunMetadata;
use floor_scan::sources::{LineFetch, LineSource, ScheduleSource, StatsSource};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub fn line(subject: Subject, stat: Stat, side: Side, line: Decimal, price: i32) -> LineEntry {
    LineEntry {
        subject,
        stat,
        side,
        line,
        price: AmericanOdds::new(price),
        source: "draftkings".to_string(),
        event_id: "evt-1".to_string(),
    }
}

/// Line source returning a fixed catalog, optionally failing until recovered
#[derive(Clone)]
pub struct FakeLines {
    pub fetch: LineFetch,
    pub remaining: Option<u32>,
    pub error: Arc<Mutex<Option<FetchError>>>,
    pub calls: Arc<AtomicU32>,
}

impl FakeLines {
    pub fn new(lines: Vec<LineEntry>) -> Self {
        Self {
            fetch: LineFetch {
                events_scanned: 1,
                events_with_lines: usize::from(!lines.is_empty()),
                catalog: lines.into_iter().collect(),
                first_event_start: None,
            },
            remaining: Some(19_990),
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
            ..Self::new(Vec::new())
        }
    }

    /// Report this remaining budget on every successful fetch
    pub fn reporting(mut self, remaining: Option<u32>) -> Self {
        self.remaining = remaining;
        self
    }

    /// Start failing every fetch with `error`
    pub fn fail_with(&self, error: FetchError) {
        *self.error.lock().unwrap() = Some(error);
    }

    /// Stop failing; later fetches return the catalog
    pub fn recover(&self) {
        *self.error.lock().unwrap() = None;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LineSource for FakeLines {
    async fn fetch_lines(&self, _date: NaiveDate) -> Result<Fetched<LineFetch>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let error = self.error.lock().unwrap().clone();
        match error {
            Some(e) => Err(e),
            None => Ok(Fetched::with_quota(self.fetch.clone(), self.remaining)),
        }
    }
}

/// Stats source backed by a map of (subject name, stat) to observations
#[derive(Clone, Default)]
pub struct FakeStats {
    pub series: HashMap<(String, Stat), Vec<Decimal>>,
}

impl FakeStats {
    pub fn with(mut self, name: &str, stat: Stat, values: Vec<Decimal>) -> Self {
        self.series.insert((name.to_string(), stat), values);
        self
    }
}

#[async_trait]
impl StatsSource for FakeStats {
    async fn fetch_series(
        &self,
        subject: &Subject,
        stat: Stat,
        lookback: usize,
    ) -> Result<Vec<Decimal>, FetchError> {
        let values = self
            .series
            .get(&(subject.name.clone(), stat))
            .ok_or_else(|| FetchError::NotFound(subject.name.clone()))?;
        let skip = values.len().saturating_sub(lookback);
        Ok(values[skip..].to_vec())
    }
}

/// Sink that always fails
pub struct FailingSink;

#[async_trait]
impl OpportunitySink for FailingSink {
    async fn record_run(
        &self,
        _metadata: &RunMetadata,
        _opportunities: &[Opportunity],
    ) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only output directory",
        )))
    }
}

/// Schedule with fixed start times
pub struct FixedSchedule(pub Vec<DateTime<Utc>>);

#[async_trait]
impl ScheduleSource for FixedSchedule {
    async fn event_starts(&self, _date: NaiveDate) -> Result<Vec<DateTime<Utc>>, FetchError> {
        Ok(self.0.clone())
    }
}

const EVENT_LIST: &str = r#"[
    {"id": "evt-1", "commence_time": "2025-11-03T19:00:00Z", "home_team": "New York Knicks", "away_team": "Boston Celtics"},
    {"id": "evt-2", "commence_time": "2025-11-03T21:30:00Z", "home_team": "Denver Nuggets", "away_team": "Miami Heat"}
]"#;

/// Local Odds API stand-in: the event list answers normally, every
/// per-event odds request gets `odds_status` with an empty body.
/// Returns the base URL.
pub async fn serve_odds_api(odds_status: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => read += n,
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]);
                let path = request.split_whitespace().nth(1).unwrap_or("");

                let (status, body) = if path.contains("/odds") {
                    (odds_status, "")
                } else {
                    ("200 OK", EVENT_LIST)
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}
