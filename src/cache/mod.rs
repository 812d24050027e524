//! Cache Module
//!
//! Provides the in-memory response cache with TTL expiry and quota-driven eviction.

mod clock;
mod entry;
mod eviction;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, Expires, Expiry, DEFAULT_TTL_SECS};
pub use eviction::{closest_to_expiry, EvictionPolicy, PriorityFn};
pub use stats::CacheStats;
pub use store::CacheStore;
