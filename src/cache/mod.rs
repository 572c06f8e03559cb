//! Quota-aware fetch cache module
//!
//! Same-day cache-or-fetch over metered external sources

mod fetch_cache;
mod types;

pub use fetch_cache::QuotaAwareFetchCache;
pub use types::{FetchError, FetchMode, Fetched, QuotaStatus};
