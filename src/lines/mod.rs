//! Betting lines module
//!
//! Posted lines, American odds prices and the per-scan line catalog

mod catalog;
mod types;

pub use catalog::LineCatalog;
pub use types::{AmericanOdds, LineEntry, LineKey, Side};
