//! Scan module
//!
//! Runs the floor/opportunity engine over one day's posted lines

mod pipeline;
mod types;

pub use pipeline::{ScanConfig, ScanPipeline, DEFAULT_LOOKBACK};
pub use types::{RunMetadata, RunSummary, ScanError};
