//! Configuration types for floor-scan

use crate::cache::FetchMode;
use crate::lines::AmericanOdds;
use crate::matcher::{MatcherConfig, DEFAULT_PRICE_FLOOR};
use crate::scan::ScanConfig;
use crate::scheduler::SchedulerConfig;
use crate::sources::{OddsApiConfig, ODDS_API_URL};
use chrono::Duration;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable overriding `odds.api_key`
pub const API_KEY_ENV: &str = "ODDS_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub floor: FloorConfig,
    #[serde(default)]
    pub matcher: MatcherSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub odds: OddsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Floor calculation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FloorConfig {
    /// Most recent games per series
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    /// Percentile threshold (10 = 10th percentile)
    #[serde(default = "default_percentile")]
    pub percentile: Decimal,
}

fn default_lookback() -> usize {
    10
}
fn default_percentile() -> Decimal {
    Decimal::new(10, 0)
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            percentile: default_percentile(),
        }
    }
}

/// Opportunity matcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherSection {
    /// Worst acceptable American price, inclusive
    #[serde(default = "default_price_floor")]
    pub price_floor: i32,

    /// Minimum games required; unset disables the check
    #[serde(default)]
    pub min_sample_size: Option<usize>,

    /// Width of the audit band around picked lines
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
}

fn default_price_floor() -> i32 {
    DEFAULT_PRICE_FLOOR.value()
}
fn default_tolerance() -> Decimal {
    Decimal::new(10, 2) // 0.10 = 10%
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            price_floor: default_price_floor(),
            min_sample_size: None,
            tolerance: default_tolerance(),
        }
    }
}

/// Run scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Minutes before the first event to run
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,

    /// Extra minutes of slack before the target
    #[serde(default)]
    pub early_start_grace_minutes: i64,

    /// Daemon tick cadence
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// IANA time zone defining the calendar day
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Run state file
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_lead_minutes() -> i64 {
    180
}
fn default_tick_interval_secs() -> u64 {
    3600
}
fn default_timezone() -> Tz {
    chrono_tz::America::Los_Angeles
}
fn default_state_path() -> PathBuf {
    PathBuf::from("./data/run_state.json")
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            lead_minutes: default_lead_minutes(),
            early_start_grace_minutes: 0,
            tick_interval_secs: default_tick_interval_secs(),
            timezone: default_timezone(),
            state_path: default_state_path(),
        }
    }
}

/// Odds API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OddsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_sport")]
    pub sport: String,
    #[serde(default = "default_bookmaker")]
    pub bookmaker: String,
    #[serde(default = "default_regions")]
    pub regions: String,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    ODDS_API_URL.to_string()
}
fn default_sport() -> String {
    "basketball_nba".to_string()
}
fn default_bookmaker() -> String {
    "draftkings".to_string()
}
fn default_regions() -> String {
    "us".to_string()
}
fn default_request_delay_ms() -> u64 {
    200
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            sport: default_sport(),
            bookmaker: default_bookmaker(),
            regions: default_regions(),
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Historical stats configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Directory of per-subject game logs
    #[serde(default = "default_game_log_dir")]
    pub game_log_dir: PathBuf,
}

fn default_game_log_dir() -> PathBuf {
    PathBuf::from("./data/game_logs")
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            game_log_dir: default_game_log_dir(),
        }
    }
}

/// Output storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for opportunity files and the run log
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Line cache snapshot used by cached scans
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data/opportunities")
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("./data/line_cache.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            cache_path: default_cache_path(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus port; unset disables the exporter
    #[serde(default)]
    pub metrics_port: Option<u16>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.odds.api_key = key.trim().to_string();
            }
        }
        self
    }

    /// Time zone defining the calendar day
    pub fn timezone(&self) -> Tz {
        self.scheduler.timezone
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            min_sample_size: self.matcher.min_sample_size,
            price_floor: AmericanOdds::new(self.matcher.price_floor),
            tolerance: self.matcher.tolerance,
        }
    }

    pub fn scan_config(&self, fetch_mode: FetchMode) -> ScanConfig {
        ScanConfig {
            lookback: self.floor.lookback,
            percentile: self.floor.percentile,
            matcher: self.matcher_config(),
            fetch_mode,
            timezone: self.timezone(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            lead: Duration::minutes(self.scheduler.lead_minutes),
            early_start_grace: Duration::minutes(self.scheduler.early_start_grace_minutes),
            timezone: self.timezone(),
            tick_interval: std::time::Duration::from_secs(self.scheduler.tick_interval_secs.max(1)),
        }
    }

    pub fn odds_config(&self) -> OddsApiConfig {
        OddsApiConfig {
            base_url: self.odds.base_url.clone(),
            api_key: self.odds.api_key.clone(),
            sport: self.odds.sport.clone(),
            bookmaker: self.odds.bookmaker.clone(),
            regions: self.odds.regions.clone(),
            timeout: std::time::Duration::from_secs(self.odds.timeout_secs),
            request_delay: std::time::Duration::from_millis(self.odds.request_delay_ms),
            timezone: self.timezone(),
        }
    }
}
