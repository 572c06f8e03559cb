//! floor-scan: percentile-floor scanner for alternate sports betting lines
//!
//! This library provides the core components for:
//! - Percentile floors and ceilings over recent performance
//! - Matching bounds against posted alternate lines with a price floor
//! - Quota-aware same-day caching of metered fetches
//! - Odds API and game-log data sources
//! - Opportunity persistence to Parquet
//! - A once-a-day run scheduler keyed on the first event start
//! - Logging and metrics

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod floor;
pub mod lines;
pub mod matcher;
pub mod scan;
pub mod scheduler;
pub mod sources;
pub mod telemetry;
