//! Percentile floor calculation
//!
//! The floor is the linear-interpolated p-th percentile of a subject's recent
//! observations, rounded up for count statistics. For p = 10 the result is
//! cleared in at least 90% of the observed games, up to one boundary
//! observation of discretization.

use super::{PerformanceSeries, Stat, StatKind, Subject};
use crate::lines::Side;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Default percentile threshold (10th percentile, a 90% hit guarantee)
pub const DEFAULT_PERCENTILE: Decimal = dec!(10);

/// Decimal places kept for continuous statistics
const CONTINUOUS_PRECISION: u32 = 1;

/// Which end of the distribution an estimate bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    /// Lower bound, used for over bets
    Floor,
    /// Upper bound, used for under bets
    Ceiling,
}

impl BoundKind {
    /// Bound that backs a bet on `side`
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Over => BoundKind::Floor,
            Side::Under => BoundKind::Ceiling,
        }
    }

    /// Bet side this bound backs
    pub fn side(&self) -> Side {
        match self {
            BoundKind::Floor => Side::Over,
            BoundKind::Ceiling => Side::Under,
        }
    }
}

/// A conservative bound derived from a performance series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorEstimate {
    pub subject: Subject,
    pub stat: Stat,
    /// Floor or ceiling
    pub bound: BoundKind,
    /// Rounded bound value
    pub value: Decimal,
    /// Interpolated percentile before rounding
    pub raw_percentile: Decimal,
    /// Percentile the raw value was taken at
    pub percentile: Decimal,
    /// Number of observations used
    pub sample_size: usize,
}

/// Computes percentile floors (and mirrored ceilings) from performance series
#[derive(Debug, Clone)]
pub struct FloorCalculator {
    percentile: Decimal,
}

impl Default for FloorCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_PERCENTILE)
    }
}

impl FloorCalculator {
    /// Create a calculator for the given percentile, clamped to [0, 100]
    pub fn new(percentile: Decimal) -> Self {
        Self {
            percentile: percentile.clamp(Decimal::ZERO, dec!(100)),
        }
    }

    pub fn percentile(&self) -> Decimal {
        self.percentile
    }

    /// Lower bound: p-th percentile, rounded up for count statistics
    pub fn floor(&self, series: &PerformanceSeries) -> FloorEstimate {
        self.bound(series, BoundKind::Floor, self.percentile)
    }

    /// Upper bound: (100 - p)-th percentile, rounded down for count statistics
    pub fn ceiling(&self, series: &PerformanceSeries) -> FloorEstimate {
        self.bound(series, BoundKind::Ceiling, dec!(100) - self.percentile)
    }

    /// Bound appropriate for a bet on `side`
    pub fn estimate(&self, series: &PerformanceSeries, side: Side) -> FloorEstimate {
        match BoundKind::for_side(side) {
            BoundKind::Floor => self.floor(series),
            BoundKind::Ceiling => self.ceiling(series),
        }
    }

    fn bound(&self, series: &PerformanceSeries, bound: BoundKind, at: Decimal) -> FloorEstimate {
        let sorted = series.sorted();
        // PerformanceSeries guarantees at least one observation
        let raw = interpolated_percentile(&sorted, at).unwrap_or(sorted[0]);
        let value = round_bound(raw, series.stat().kind(), bound);

        FloorEstimate {
            subject: series.subject().clone(),
            stat: series.stat(),
            bound,
            value,
            raw_percentile: raw,
            percentile: at,
            sample_size: series.len(),
        }
    }
}

/// Linear-interpolated percentile of an ascending slice.
///
/// The rank is `p / 100 * (n - 1)`; a fractional rank interpolates between the
/// two neighbouring order statistics. Returns `None` for an empty slice.
pub fn interpolated_percentile(sorted: &[Decimal], percentile: Decimal) -> Option<Decimal> {
    let last = sorted.len().checked_sub(1)?;
    let p = percentile.clamp(Decimal::ZERO, dec!(100));

    let rank = p / dec!(100) * Decimal::from(last);
    let lower = rank.floor();
    let fraction = rank - lower;
    let lo = lower.to_usize().unwrap_or(0).min(last);
    let hi = (lo + 1).min(last);

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * fraction)
}

/// Round a raw percentile toward the conservative side of its bound
fn round_bound(raw: Decimal, kind: StatKind, bound: BoundKind) -> Decimal {
    match (kind, bound) {
        (StatKind::Count, BoundKind::Floor) => raw.ceil(),
        (StatKind::Count, BoundKind::Ceiling) => raw.floor(),
        (StatKind::Continuous, BoundKind::Floor) => {
            raw.round_dp_with_strategy(CONTINUOUS_PRECISION, RoundingStrategy::ToPositiveInfinity)
        }
        (StatKind::Continuous, BoundKind::Ceiling) => {
            raw.round_dp_with_strategy(CONTINUOUS_PRECISION, RoundingStrategy::ToNegativeInfinity)
        }
    }
}
