//! Floor estimation module
//!
//! Performance series and the percentile floor calculator

mod calculator;
mod series;
mod types;

pub use calculator::{
    interpolated_percentile, BoundKind, FloorCalculator, FloorEstimate, DEFAULT_PERCENTILE,
};
pub use series::{PerformanceSeries, SeriesError};
pub use types::{Stat, StatKind, Subject, SubjectKind};
