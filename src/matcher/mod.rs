//! Opportunity matching module
//!
//! Single-predicate confidence gate, price floor and deterministic tie-break

mod opportunity;
mod types;

pub use opportunity::{
    Evaluation, MatchOutcome, MatcherConfig, OpportunityMatcher, DEFAULT_PRICE_FLOOR,
    DEFAULT_TOLERANCE,
};
pub use types::{Opportunity, SkipCounters, SkipReason, ToleranceBand};
