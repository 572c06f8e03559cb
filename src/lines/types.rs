//! Betting line types

use crate::floor::{Stat, Subject};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bet direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Over => f.write_str("OVER"),
            Side::Under => f.write_str("UNDER"),
        }
    }
}

/// American odds price, e.g. -150 or +120.
///
/// Ordering follows payout: a numerically greater price is always the better
/// price for the bettor (-200 < -150 < +110 < +150).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmericanOdds(i32);

impl AmericanOdds {
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    /// American prices have magnitude of at least 100
    pub fn is_valid(&self) -> bool {
        self.0.unsigned_abs() >= 100
    }

    /// Implied win probability of the price, ignoring vig
    pub fn implied_probability(&self) -> Option<Decimal> {
        if !self.is_valid() {
            return None;
        }
        let price = Decimal::from(self.0);
        if self.0 < 0 {
            Some(-price / (-price + dec!(100)))
        } else {
            Some(dec!(100) / (price + dec!(100)))
        }
    }

    /// Decimal (European) odds: total return per unit staked
    pub fn decimal_odds(&self) -> Option<Decimal> {
        if !self.is_valid() {
            return None;
        }
        let price = Decimal::from(self.0);
        if self.0 < 0 {
            Some(dec!(1) + dec!(100) / -price)
        } else {
            Some(dec!(1) + price / dec!(100))
        }
    }
}

impl fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A single posted line for one subject, statistic and side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineEntry {
    pub subject: Subject,
    pub stat: Stat,
    pub side: Side,
    /// Threshold, possibly a half point (e.g. 15.5)
    pub line: Decimal,
    pub price: AmericanOdds,
    /// Bookmaker that posted the line
    pub source: String,
    /// Event the line belongs to
    pub event_id: String,
}

impl LineEntry {
    /// False for negative thresholds or prices that are not valid American odds
    pub fn is_well_formed(&self) -> bool {
        self.line >= Decimal::ZERO && self.price.is_valid()
    }
}

/// Grouping key for lines: one pick is emitted per key at most
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub subject: Subject,
    pub stat: Stat,
    pub side: Side,
}

impl From<&LineEntry> for LineKey {
    fn from(entry: &LineEntry) -> Self {
        Self {
            subject: entry.subject.clone(),
            stat: entry.stat,
            side: entry.side,
        }
    }
}
