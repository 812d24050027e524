//! Eviction Policy Module
//!
//! Chooses which entry to drop when the persistence backend runs out of room.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheEntry, Expiry};

/// Comparator ranking entries for eviction; the entry ordered first is evicted.
pub type PriorityFn = Arc<dyn Fn(&CacheEntry, &CacheEntry) -> Ordering + Send + Sync>;

// == Default Priority ==
/// Orders entries closest-to-expiry first.
///
/// Entries that never expire rank after every dated entry and tie with each
/// other, so they are only chosen once no dated entry is left.
pub fn closest_to_expiry(a: &CacheEntry, b: &CacheEntry) -> Ordering {
    match (a.expires_at, b.expires_at) {
        (Expiry::At(x), Expiry::At(y)) => x.cmp(&y),
        (Expiry::At(_), Expiry::Never) => Ordering::Less,
        (Expiry::Never, Expiry::At(_)) => Ordering::Greater,
        (Expiry::Never, Expiry::Never) => Ordering::Equal,
    }
}

// == Eviction Policy ==
/// Picks one victim key per call using a pluggable priority comparator.
#[derive(Clone)]
pub struct EvictionPolicy {
    priority: PriorityFn,
}

impl EvictionPolicy {
    // == Constructor ==
    /// Creates a policy using [`closest_to_expiry`].
    pub fn new() -> Self {
        Self {
            priority: Arc::new(closest_to_expiry),
        }
    }

    /// Replaces the ranking comparator.
    pub fn with_priority<F>(priority: F) -> Self
    where
        F: Fn(&CacheEntry, &CacheEntry) -> Ordering + Send + Sync + 'static,
    {
        Self {
            priority: Arc::new(priority),
        }
    }

    // == Select Victim ==
    /// Returns the key of the entry ranked first, or None for an empty store.
    ///
    /// Ties keep the store's key order: the first of several equally ranked
    /// entries wins.
    pub fn select_victim(&self, entries: &BTreeMap<String, CacheEntry>) -> Option<String> {
        entries
            .iter()
            .min_by(|(_, a), (_, b)| (self.priority)(a, b))
            .map(|(key, _)| key.clone())
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictionPolicy").finish_non_exhaustive()
    }
}
