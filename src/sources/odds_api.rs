//! Odds API client for events and alternate lines
//!
//! Lists the day's events for one sport, then pulls alternate player-prop
//! markets and alternate team totals for each event from a single bookmaker.
//! The provider meters requests and reports the remaining budget in a
//! response header.

use super::{LineFetch, LineSource, ScheduleSource};
use crate::cache::{FetchError, Fetched};
use crate::floor::{Stat, Subject};
use crate::lines::{AmericanOdds, LineCatalog, LineEntry, Side};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Odds API base URL
pub const ODDS_API_URL: &str = "https://api.the-odds-api.com/v4";

const REMAINING_HEADER: &str = "x-requests-remaining";

/// Market keys requested per event and the statistic each carries
const MARKETS: [(&str, Stat); 7] = [
    ("player_points_alternate", Stat::Points),
    ("player_rebounds_alternate", Stat::Rebounds),
    ("player_assists_alternate", Stat::Assists),
    ("player_threes_alternate", Stat::Threes),
    ("player_steals_alternate", Stat::Steals),
    ("player_blocks_alternate", Stat::Blocks),
    ("alternate_team_totals", Stat::TeamPoints),
];

/// Configuration for the Odds API client
#[derive(Debug, Clone)]
pub struct OddsApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Sport key, e.g. "basketball_nba"
    pub sport: String,
    /// Bookmaker whose lines are used
    pub bookmaker: String,
    pub regions: String,
    /// Request timeout
    pub timeout: Duration,
    /// Pause between per-event requests
    pub request_delay: Duration,
    /// Time zone defining the calendar day
    pub timezone: Tz,
}

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            base_url: ODDS_API_URL.to_string(),
            api_key: String::new(),
            sport: "basketball_nba".to_string(),
            bookmaker: "draftkings".to_string(),
            regions: "us".to_string(),
            timeout: Duration::from_secs(10),
            request_delay: Duration::from_millis(200),
            timezone: Tz::UTC,
        }
    }
}

/// Client for the Odds API
#[derive(Clone)]
pub struct OddsApiClient {
    config: OddsApiConfig,
    client: Client,
}

impl OddsApiClient {
    /// Create a new client with custom configuration
    pub fn new(config: OddsApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OddsApiConfig {
        &self.config
    }

    /// Events starting within the calendar day `date`
    async fn list_events(&self, date: NaiveDate) -> Result<(Vec<ApiEvent>, Option<u32>), FetchError> {
        let url = format!("{}/sports/{}/events", self.config.base_url, self.config.sport);
        let (from, to) = day_bounds(date, self.config.timezone);

        tracing::debug!(url = %url, date = %date, "Fetching event list");

        let (events, remaining): (Vec<ApiEvent>, _) = self
            .get_json(
                &url,
                &[
                    ("apiKey", self.config.api_key.clone()),
                    ("commenceTimeFrom", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    ("commenceTimeTo", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ],
            )
            .await?;

        let events = events
            .into_iter()
            .filter(|e| e.commence_time >= from && e.commence_time < to)
            .collect();
        Ok((events, remaining))
    }

    /// Alternate markets for one event
    async fn fetch_event_odds(&self, event_id: &str) -> Result<(ApiEventOdds, Option<u32>), FetchError> {
        let url = format!(
            "{}/sports/{}/events/{}/odds",
            self.config.base_url, self.config.sport, event_id
        );
        let markets = MARKETS.iter().map(|(key, _)| *key).collect::<Vec<_>>().join(",");

        self.get_json(
            &url,
            &[
                ("apiKey", self.config.api_key.clone()),
                ("regions", self.config.regions.clone()),
                ("markets", markets),
                ("oddsFormat", "american".to_string()),
                ("bookmakers", self.config.bookmaker.clone()),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Option<u32>), FetchError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        let remaining = remaining_quota(response.headers());
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let bytes = response.bytes().await?;
        let value = serde_json::from_slice(&bytes)?;
        Ok((value, remaining))
    }
}

#[async_trait]
impl ScheduleSource for OddsApiClient {
    async fn event_starts(&self, date: NaiveDate) -> Result<Vec<DateTime<Utc>>, FetchError> {
        let (events, remaining) = self.list_events(date).await?;
        tracing::debug!(date = %date, events = events.len(), remaining = ?remaining, "Fetched schedule");
        Ok(events.into_iter().map(|e| e.commence_time).collect())
    }
}

#[async_trait]
impl LineSource for OddsApiClient {
    async fn fetch_lines(&self, date: NaiveDate) -> Result<Fetched<LineFetch>, FetchError> {
        let (events, mut remaining) = self.list_events(date).await?;

        let mut fetch = LineFetch {
            catalog: LineCatalog::new(),
            events_scanned: events.len(),
            events_with_lines: 0,
            first_event_start: events.iter().map(|e| e.commence_time).min(),
        };

        let mut answered = 0usize;
        let mut last_error = None;

        for (i, event) in events.iter().enumerate() {
            if i > 0 && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }

            let odds = match self.fetch_event_odds(&event.id).await {
                Ok((odds, reported)) => {
                    remaining = reported.or(remaining);
                    answered += 1;
                    odds
                }
                Err(FetchError::QuotaExhausted) => return Err(FetchError::QuotaExhausted),
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.id,
                        matchup = %format!("{} @ {}", event.away_team, event.home_team),
                        error = %e,
                        "Failed to fetch event lines"
                    );
                    last_error = Some(e);
                    continue;
                }
            };

            let lines = parse_event_lines(&odds, &self.config.bookmaker);
            if !lines.is_empty() {
                fetch.events_with_lines += 1;
            }
            for line in lines {
                fetch.catalog.push(line);
            }
        }

        // One bad event is tolerated; an outage across the slate is not
        if answered == 0 {
            if let Some(err) = last_error {
                tracing::error!(date = %date, events = fetch.events_scanned, error = %err, "Every event lines request failed");
                return Err(err);
            }
        }

        tracing::info!(
            date = %date,
            events = fetch.events_scanned,
            events_with_lines = fetch.events_with_lines,
            lines = fetch.catalog.len(),
            remaining = ?remaining,
            "Fetched alternate lines"
        );

        Ok(Fetched::with_quota(fetch, remaining))
    }
}

/// UTC instants bounding the calendar day `date` in `tz`, end exclusive.
///
/// Days that change daylight saving are 23 or 25 hours long.
fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    (local_midnight(date, tz), local_midnight(next, tz))
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

fn remaining_quota(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(REMAINING_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| *v >= 0.0)
        .map(|v| v as u32)
}

fn status_error(status: StatusCode, body: &str) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::TOO_MANY_REQUESTS => FetchError::QuotaExhausted,
        StatusCode::NOT_FOUND => FetchError::NotFound(body.to_string()),
        _ => FetchError::Network(format!("Odds API error: {} - {}", status, body)),
    }
}

/// Convert one event's bookmaker markets into line entries.
///
/// Player markets contribute overs only; team totals contribute both sides.
/// Outcomes without a point or price are dropped.
fn parse_event_lines(odds: &ApiEventOdds, bookmaker: &str) -> Vec<LineEntry> {
    let Some(book) = odds.bookmakers.iter().find(|b| b.key == bookmaker) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for market in &book.markets {
        let Some(stat) = stat_for_market(&market.key) else {
            continue;
        };

        for outcome in &market.outcomes {
            let side = match outcome.name.as_str() {
                "Over" => Side::Over,
                "Under" if stat == Stat::TeamPoints => Side::Under,
                _ => continue,
            };
            let Some(name) = outcome.description.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            let (Some(point), Some(price)) = (outcome.point, outcome.price) else {
                tracing::debug!(market = %market.key, subject = %name, "Outcome missing point or price");
                continue;
            };

            let subject = if stat == Stat::TeamPoints {
                Subject::team(name)
            } else {
                Subject::player(name)
            };

            lines.push(LineEntry {
                subject,
                stat,
                side,
                line: point,
                price: AmericanOdds::new(price),
                source: book.key.clone(),
                event_id: odds.id.clone(),
            });
        }
    }
    lines
}

fn stat_for_market(key: &str) -> Option<Stat> {
    MARKETS.iter().find(|(k, _)| *k == key).map(|(_, stat)| *stat)
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    commence_time: DateTime<Utc>,
    #[serde(default)]
    home_team: String,
    #[serde(default)]
    away_team: String,
}

#[derive(Debug, Deserialize)]
struct ApiEventOdds {
    id: String,
    #[serde(default)]
    bookmakers: Vec<ApiBookmaker>,
}

#[derive(Debug, Deserialize)]
struct ApiBookmaker {
    key: String,
    #[serde(default)]
    markets: Vec<ApiMarket>,
}

#[derive(Debug, Deserialize)]
struct ApiMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<ApiOutcome>,
}

#[derive(Debug, Deserialize)]
struct ApiOutcome {
    name: String,
    description: Option<String>,
    point: Option<Decimal>,
    price: Option<i32>,
}
