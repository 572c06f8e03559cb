//! Opportunity and skip-reason types

use crate::floor::{BoundKind, Stat, Subject, SubjectKind};
use crate::lines::{AmericanOdds, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Band of +/- tolerance around a line.
///
/// Carried on opportunities for audit only; it has no part in accepting or
/// rejecting a line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceBand {
    pub lower: Decimal,
    pub upper: Decimal,
}

impl ToleranceBand {
    /// Band of `line * (1 -/+ tolerance)`
    pub fn around(line: Decimal, tolerance: Decimal) -> Self {
        Self {
            lower: line * (Decimal::ONE - tolerance),
            upper: line * (Decimal::ONE + tolerance),
        }
    }
}

/// A line the recent-performance bound clears at an acceptable price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Unique opportunity identifier
    pub id: Uuid,
    pub subject: Subject,
    pub stat: Stat,
    pub side: Side,
    /// Line value picked
    pub line: Decimal,
    pub price: AmericanOdds,
    /// Floor (over) or ceiling (under)
    pub bound: BoundKind,
    /// Rounded bound value that cleared the line
    pub bound_value: Decimal,
    /// Bound before rounding
    pub raw_percentile: Decimal,
    pub sample_size: usize,
    /// Observations behind the bound, most recent last
    pub recent: Vec<Decimal>,
    /// Observations that would have won this bet
    pub hit_count: usize,
    /// Bookmaker of the picked line
    pub source: String,
    pub event_id: String,
    pub band: ToleranceBand,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
}

impl Opportunity {
    pub fn subject_kind(&self) -> SubjectKind {
        self.subject.kind
    }

    /// Hit rate as "hits/games", e.g. "9/10"
    pub fn hit_rate(&self) -> String {
        format!("{}/{}", self.hit_count, self.sample_size)
    }
}

/// Why a subject/statistic/side produced no opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Sample size below the configured minimum
    InsufficientSample { sample_size: usize, minimum: usize },
    /// No well-formed line satisfies the bound
    NoQualifyingLine,
    /// Lines satisfied the bound but every one failed the price floor
    PriceRejected { best_price: AmericanOdds },
    /// Stats source returned an unusable series
    InvalidSeries(String),
    /// Stats source has no history for the subject
    NoHistory,
}

impl SkipReason {
    /// Stable label used for counters and metrics
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::InsufficientSample { .. } => "insufficient_sample",
            SkipReason::NoQualifyingLine => "no_qualifying_line",
            SkipReason::PriceRejected { .. } => "price_rejected",
            SkipReason::InvalidSeries(_) => "invalid_series",
            SkipReason::NoHistory => "no_history",
        }
    }
}

/// Running skip-reason counters for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounters {
    pub insufficient_sample: u32,
    pub no_qualifying_line: u32,
    pub price_rejected: u32,
    pub invalid_series: u32,
    pub no_history: u32,
    /// Individual lines dropped as malformed
    pub malformed_lines: u32,
}

impl SkipCounters {
    pub fn record(&mut self, reason: &SkipReason) {
        let counter = match reason {
            SkipReason::InsufficientSample { .. } => &mut self.insufficient_sample,
            SkipReason::NoQualifyingLine => &mut self.no_qualifying_line,
            SkipReason::PriceRejected { .. } => &mut self.price_rejected,
            SkipReason::InvalidSeries(_) => &mut self.invalid_series,
            SkipReason::NoHistory => &mut self.no_history,
        };
        *counter += 1;
    }

    /// Total skipped evaluations (malformed lines are counted separately)
    pub fn total(&self) -> u32 {
        self.insufficient_sample
            + self.no_qualifying_line
            + self.price_rejected
            + self.invalid_series
            + self.no_history
    }
}
