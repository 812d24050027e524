//! Cache Statistics Module
//!
//! Counts how fetches were answered and what storage pressure cost the cache.

use serde::Serialize;

// == Cache Stats ==
/// Lookup outcomes and storage bookkeeping for one store.
///
/// `hits` counts every usable entry handed out; `prefills` is the subset that
/// was applied ahead of a live refresh rather than served outright. Likewise
/// `stale` is the subset of `misses` where an entry existed but had expired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub prefills: u64,
    pub misses: u64,
    pub stale: u64,
    /// Entries dropped to make a write fit the storage quota
    pub evictions: u64,
    /// Writes kept in memory that storage did not accept
    pub write_failures: u64,
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Rates ==
    /// Share of cache lookups that found a usable entry, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.hits + self.misses)
    }

    /// Hits that answered a fetch without touching the network.
    pub fn served_from_cache(&self) -> u64 {
        self.hits.saturating_sub(self.prefills)
    }

    /// Share of lookups that avoided a live fetch entirely.
    pub fn offload_rate(&self) -> f64 {
        ratio(self.served_from_cache(), self.hits + self.misses)
    }

    // == Recording ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Reclassifies an already recorded hit as a prefill.
    pub fn record_prefill(&mut self) {
        self.prefills += 1;
    }

    /// A miss; `stale` when an expired entry was present for the key.
    pub fn record_miss(&mut self, stale: bool) {
        self.misses += 1;
        if stale {
            self.stale += 1;
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
