//! Recent-performance series

use super::{Stat, Subject};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a series
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    /// No observations in the window
    #[error("empty {stat} series for {subject}")]
    Empty { subject: String, stat: Stat },
    /// An observation below zero
    #[error("negative {stat} observation {value} for {subject}")]
    NegativeObservation {
        subject: String,
        stat: Stat,
        value: Decimal,
    },
}

/// Ordered window of recent observations for one subject and statistic.
///
/// Observations are stored most-recent-last. A series always holds at least
/// one observation and every observation is non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct PerformanceSeries {
    subject: Subject,
    stat: Stat,
    observations: Vec<Decimal>,
}

#[derive(Deserialize)]
struct RawSeries {
    subject: Subject,
    stat: Stat,
    observations: Vec<Decimal>,
}

impl TryFrom<RawSeries> for PerformanceSeries {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        Self::new(raw.subject, raw.stat, raw.observations)
    }
}

impl PerformanceSeries {
    /// Build a validated series
    pub fn new(
        subject: Subject,
        stat: Stat,
        observations: Vec<Decimal>,
    ) -> Result<Self, SeriesError> {
        if observations.is_empty() {
            return Err(SeriesError::Empty {
                subject: subject.name,
                stat,
            });
        }
        if let Some(value) = observations.iter().find(|v| **v < Decimal::ZERO) {
            return Err(SeriesError::NegativeObservation {
                subject: subject.name,
                stat,
                value: *value,
            });
        }

        Ok(Self {
            subject,
            stat,
            observations,
        })
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn stat(&self) -> Stat {
        self.stat
    }

    /// Observations, most recent last
    pub fn observations(&self) -> &[Decimal] {
        &self.observations
    }

    /// Sample size N (always >= 1)
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Always false; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Latest observation
    pub fn most_recent(&self) -> Decimal {
        self.observations[self.observations.len() - 1]
    }

    /// Observations in ascending order
    pub fn sorted(&self) -> Vec<Decimal> {
        let mut sorted = self.observations.clone();
        sorted.sort();
        sorted
    }

    /// Number of observations at or above `value`
    pub fn count_at_least(&self, value: Decimal) -> usize {
        self.observations.iter().filter(|v| **v >= value).count()
    }

    /// Number of observations at or below `value`
    pub fn count_at_most(&self, value: Decimal) -> usize {
        self.observations.iter().filter(|v| **v <= value).count()
    }
}
