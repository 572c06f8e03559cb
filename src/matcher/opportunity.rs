//! Floor-to-line matching

use super::{Opportunity, SkipReason, ToleranceBand};
use crate::floor::{BoundKind, FloorEstimate, PerformanceSeries};
use crate::lines::{AmericanOdds, LineEntry, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::cmp::Ordering;
use uuid::Uuid;

/// Default price floor: prices below -500 are rejected
pub const DEFAULT_PRICE_FLOOR: AmericanOdds = AmericanOdds::new(-500);

/// Default width of the audit tolerance band
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.10);

/// Configuration for the opportunity matcher
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Minimum sample size; `None` disables the gate
    pub min_sample_size: Option<usize>,
    /// Worst acceptable price, inclusive
    pub price_floor: AmericanOdds,
    /// Width of the audit band around the picked line
    pub tolerance: Decimal,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_sample_size: None,
            price_floor: DEFAULT_PRICE_FLOOR,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Result of matching one estimate against its lines
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A line passed every filter
    Emit(Opportunity),
    /// No opportunity, with the reason
    Skip(SkipReason),
}

/// Outcome plus per-line bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outcome: MatchOutcome,
    /// Lines dropped as malformed before filtering
    pub malformed_lines: usize,
}

/// Matches floor estimates against posted lines
#[derive(Debug, Clone, Default)]
pub struct OpportunityMatcher {
    config: MatcherConfig,
}

impl OpportunityMatcher {
    /// Create a new matcher with given configuration
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Confidence gate: floor >= line for overs, ceiling <= line for unders
    pub fn clears(bound: BoundKind, bound_value: Decimal, line: Decimal) -> bool {
        match bound {
            BoundKind::Floor => bound_value >= line,
            BoundKind::Ceiling => bound_value <= line,
        }
    }

    /// Price gate; a price equal to the floor is accepted
    pub fn price_acceptable(&self, price: AmericanOdds) -> bool {
        price >= self.config.price_floor
    }

    /// Evaluate one (subject, statistic, side) against its complete line set.
    ///
    /// Lines for other subjects, statistics or sides are ignored. Emits at
    /// most one opportunity: the tightest line that still clears the bound,
    /// with ties on line value broken by the better price.
    pub fn evaluate(
        &self,
        estimate: &FloorEstimate,
        series: &PerformanceSeries,
        lines: &[LineEntry],
        now: DateTime<Utc>,
    ) -> Evaluation {
        let side = estimate.bound.side();
        let (well_formed, malformed): (Vec<&LineEntry>, Vec<&LineEntry>) = lines
            .iter()
            .filter(|l| l.side == side && l.stat == estimate.stat && l.subject == estimate.subject)
            .partition(|l| l.is_well_formed());

        if !malformed.is_empty() {
            tracing::debug!(
                subject = %estimate.subject,
                stat = %estimate.stat,
                count = malformed.len(),
                "Dropping malformed lines"
            );
        }

        let outcome = self.select(estimate, series, &well_formed, now);
        Evaluation {
            outcome,
            malformed_lines: malformed.len(),
        }
    }

    fn select(
        &self,
        estimate: &FloorEstimate,
        series: &PerformanceSeries,
        lines: &[&LineEntry],
        now: DateTime<Utc>,
    ) -> MatchOutcome {
        if let Some(minimum) = self.config.min_sample_size {
            if estimate.sample_size < minimum {
                return MatchOutcome::Skip(SkipReason::InsufficientSample {
                    sample_size: estimate.sample_size,
                    minimum,
                });
            }
        }

        let qualifying: Vec<&LineEntry> = lines
            .iter()
            .copied()
            .filter(|l| Self::clears(estimate.bound, estimate.value, l.line))
            .collect();

        if qualifying.is_empty() {
            return MatchOutcome::Skip(SkipReason::NoQualifyingLine);
        }

        let priced: Vec<&LineEntry> = qualifying
            .iter()
            .copied()
            .filter(|l| self.price_acceptable(l.price))
            .collect();

        let best = match priced.into_iter().max_by(|a, b| rank_lines(estimate.bound, a, b)) {
            Some(best) => best,
            None => {
                let best_price = qualifying
                    .iter()
                    .map(|l| l.price)
                    .max()
                    .unwrap_or(self.config.price_floor);
                return MatchOutcome::Skip(SkipReason::PriceRejected { best_price });
            }
        };

        MatchOutcome::Emit(Opportunity {
            id: Uuid::new_v4(),
            subject: estimate.subject.clone(),
            stat: estimate.stat,
            side: best.side,
            line: best.line,
            price: best.price,
            bound: estimate.bound,
            bound_value: estimate.value,
            raw_percentile: estimate.raw_percentile,
            sample_size: estimate.sample_size,
            recent: series.observations().to_vec(),
            hit_count: hit_count(series, best.side, best.line),
            source: best.source.clone(),
            event_id: best.event_id.clone(),
            band: ToleranceBand::around(best.line, self.config.tolerance),
            timestamp: now,
        })
    }
}

/// Preference order between two qualifying lines; the greater one wins.
///
/// Overs prefer the highest line, unders the lowest, then the better price,
/// then the lexicographically smaller source for determinism.
fn rank_lines(bound: BoundKind, a: &LineEntry, b: &LineEntry) -> Ordering {
    let by_line = match bound {
        BoundKind::Floor => a.line.cmp(&b.line),
        BoundKind::Ceiling => b.line.cmp(&a.line),
    };
    by_line
        .then(a.price.cmp(&b.price))
        .then_with(|| b.source.cmp(&a.source))
}

/// Observations that would have won a bet on `side` at `line`
fn hit_count(series: &PerformanceSeries, side: Side, line: Decimal) -> usize {
    series
        .observations()
        .iter()
        .filter(|v| match side {
            Side::Over => **v > line,
            Side::Under => **v < line,
        })
        .count()
}
