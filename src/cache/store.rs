//! Cache Store Module
//!
//! In-memory map of cache entries, persisted as a whole after every write and
//! trimmed by the eviction policy when storage runs out of room.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, EvictionPolicy};
use crate::error::{CacheError, Result};
use crate::storage::PersistenceAdapter;

// == Cache Store ==
/// The authoritative runtime cache.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage, ordered by key
    entries: BTreeMap<String, CacheEntry>,
    /// Where the whole map is written after each change
    persistence: PersistenceAdapter,
    /// Victim selection under quota pressure
    eviction: EvictionPolicy,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store without priming it from persistence.
    pub fn new(persistence: PersistenceAdapter, eviction: EvictionPolicy) -> Self {
        Self {
            entries: BTreeMap::new(),
            persistence,
            eviction,
            stats: CacheStats::new(),
        }
    }

    /// Creates a store primed from whatever the persistence slot holds.
    ///
    /// A missing or corrupt slot leaves the store empty.
    pub fn open(persistence: PersistenceAdapter, eviction: EvictionPolicy) -> Self {
        let mut store = Self::new(persistence, eviction);
        let loaded = store.persistence.load();
        debug!("Primed cache with {} persisted entries", loaded.len());
        store.replace_all(loaded);
        store
    }

    /// A store that only lives in memory.
    pub fn in_memory() -> Self {
        Self::new(PersistenceAdapter::disabled(), EvictionPolicy::new())
    }

    // == Get ==
    /// Returns the entry for `key`, expired or not.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Lookup ==
    /// Returns the value for `key` if an entry exists and is usable at `now_ms`.
    ///
    /// Counts a hit or a miss. Expired entries stay in place until overwritten.
    pub fn lookup(&mut self, key: &str, now_ms: u64) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_usable(now_ms) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            stale => {
                self.stats.record_miss(stale.is_some());
                None
            }
        }
    }

    /// Marks the last hit as applied ahead of a live refresh.
    pub fn record_prefill(&mut self) {
        self.stats.record_prefill();
    }

    // == Set ==
    /// Stores an entry, replacing any previous one for the key, then persists.
    ///
    /// The in-memory write always sticks. If storage is full, entries are
    /// evicted one at a time until a write succeeds; `QuotaExhausted` is
    /// returned if the store empties and storage still refuses.
    pub fn set(&mut self, key: impl Into<String>, entry: CacheEntry) -> Result<()> {
        let key = key.into();
        debug!("Caching {}", key);
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
        let result = self.persist();
        if result.is_err() {
            self.stats.record_write_failure();
        }
        result
    }

    // == Delete ==
    /// Removes an entry by key. Removing an absent key is a no-op.
    ///
    /// Returns whether an entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Replace All ==
    /// Swaps in a whole new set of entries without persisting.
    pub fn replace_all(&mut self, entries: BTreeMap<String, CacheEntry>) {
        self.entries = entries;
        self.stats.set_total_entries(self.entries.len());
    }

    // == Persist ==
    /// Writes the store, evicting under quota pressure.
    ///
    /// Each failed attempt removes exactly one entry, so a store of N entries
    /// makes at most N + 1 write attempts.
    pub fn persist(&mut self) -> Result<()> {
        loop {
            match self.persistence.save(&self.entries) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_quota_exceeded() => {
                    let Some(victim) = self.eviction.select_victim(&self.entries) else {
                        return Err(CacheError::QuotaExhausted);
                    };
                    warn!("Storage quota exceeded, evicting {}", victim);
                    self.entries.remove(&victim);
                    self.stats.record_eviction();
                    self.stats.set_total_entries(self.entries.len());
                }
                Err(e) => return Err(e),
            }
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn entries(&self) -> &BTreeMap<String, CacheEntry> {
        &self.entries
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Expires, Expiry};
    use crate::error::StorageError;
    use crate::storage::{MemoryBackend, StorageBackend};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const NOW: u64 = 1_000_000;

    fn entry(value: Value, expiry: Expiry) -> CacheEntry {
        CacheEntry {
            expires_at: expiry,
            value,
        }
    }

    /// Backend that refuses every write and remembers what it was offered.
    #[derive(Default)]
    struct FullBackend {
        attempts: Mutex<Vec<String>>,
    }

    impl StorageBackend for FullBackend {
        fn get_item(&self, _slot: &str) -> std::result::Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set_item(&self, _slot: &str, value: &str) -> std::result::Result<(), StorageError> {
            self.attempts.lock().unwrap().push(value.to_string());
            Err(StorageError::QuotaExceeded)
        }
    }

    /// Backend failing with an I/O error.
    struct BrokenBackend;

    impl StorageBackend for BrokenBackend {
        fn get_item(&self, _slot: &str) -> std::result::Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set_item(&self, _slot: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk on fire")))
        }
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::in_memory();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_lookup() {
        let mut store = CacheStore::in_memory();

        store
            .set("/users/1", CacheEntry::new(json!({"id": 1}), None, 300, NOW))
            .unwrap();

        assert_eq!(store.lookup("/users/1", NOW), Some(json!({"id": 1})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lookup_expired_keeps_entry() {
        let mut store = CacheStore::in_memory();
        store
            .set("/a", CacheEntry::new(json!(1), Some(Expires::After(1)), 300, NOW))
            .unwrap();

        assert!(store.lookup("/a", NOW + 999).is_some());
        assert!(store.lookup("/a", NOW + 1_000).is_none());

        // Expiry makes the entry unusable but does not remove it
        assert!(store.get("/a").is_some());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::in_memory();

        store.set("k", entry(json!("v1"), Expiry::At(NOW))).unwrap();
        store.set("k", entry(json!("v2"), Expiry::Never)).unwrap();

        assert_eq!(store.get("k"), Some(&entry(json!("v2"), Expiry::Never)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_delete_is_idempotent() {
        let mut store = CacheStore::in_memory();
        store.set("k", entry(json!(1), Expiry::Never)).unwrap();

        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::in_memory();
        store.set("k", entry(json!(1), Expiry::Never)).unwrap();

        store.set("old", entry(json!(2), Expiry::At(NOW))).unwrap();

        store.lookup("k", NOW);
        store.record_prefill();
        store.lookup("missing", NOW);
        store.lookup("old", NOW);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.prefills, 1);
        assert_eq!(stats.served_from_cache(), 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.total_entries, 2);
    }

    #[test]
    fn test_store_persists_on_set() {
        let backend = Arc::new(MemoryBackend::new());
        let persistence = PersistenceAdapter::new(backend.clone(), "slot");
        let mut store = CacheStore::new(persistence.clone(), EvictionPolicy::new());

        store.set("k", entry(json!({"a": 1}), Expiry::At(5))).unwrap();

        let reopened = CacheStore::open(persistence, EvictionPolicy::new());
        assert_eq!(reopened.entries(), store.entries());
    }

    #[test]
    fn test_store_evicts_until_write_fits() {
        let persistence = PersistenceAdapter::new(Arc::new(MemoryBackend::with_quota(140)), "slot");
        let mut store = CacheStore::new(persistence, EvictionPolicy::new());

        store.set("a", entry(json!("x".repeat(30)), Expiry::At(10))).unwrap();
        store.set("b", entry(json!("x".repeat(30)), Expiry::At(20))).unwrap();
        store.set("c", entry(json!("x".repeat(30)), Expiry::At(30))).unwrap();

        // Only the two latest-expiring entries fit in the quota
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
        assert!(store.get("c").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_eviction_terminates_on_full_backend() {
        let backend = Arc::new(FullBackend::default());
        let persistence = PersistenceAdapter::new(backend.clone(), "slot");
        let mut store = CacheStore::new(persistence, EvictionPolicy::new());
        store.replace_all(
            [
                ("t3".to_string(), entry(json!(3), Expiry::At(300))),
                ("t1".to_string(), entry(json!(1), Expiry::At(100))),
                ("t2".to_string(), entry(json!(2), Expiry::At(200))),
            ]
            .into_iter()
            .collect(),
        );

        let result = store.set("forever", entry(json!(0), Expiry::Never));

        assert!(matches!(result, Err(CacheError::QuotaExhausted)));
        assert!(store.is_empty());
        assert_eq!(store.stats().evictions, 4);
        assert_eq!(store.stats().write_failures, 1);

        // Each retry happens after exactly one more eviction, closest expiry first
        let attempts = backend.attempts.lock().unwrap();
        let keys: Vec<Vec<String>> = attempts
            .iter()
            .map(|blob| {
                let map: BTreeMap<String, CacheEntry> = serde_json::from_str(blob).unwrap();
                map.into_keys().collect()
            })
            .collect();
        assert_eq!(
            keys,
            vec![
                vec!["forever", "t1", "t2", "t3"],
                vec!["forever", "t2", "t3"],
                vec!["forever", "t3"],
                vec!["forever"],
                vec![],
            ]
        );
    }

    #[test]
    fn test_store_other_storage_error_keeps_memory_write() {
        let persistence = PersistenceAdapter::new(Arc::new(BrokenBackend), "slot");
        let mut store = CacheStore::new(persistence, EvictionPolicy::new());

        let result = store.set("k", entry(json!(1), Expiry::Never));

        assert!(matches!(result, Err(CacheError::Storage(StorageError::Io(_)))));
        assert!(store.get("k").is_some());
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.stats().write_failures, 1);
    }
}
