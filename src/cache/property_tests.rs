//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check expiry, persistence and eviction behaviour over
//! generated stores.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::cache::{CacheEntry, CacheStore, EvictionPolicy, Expires, Expiry};
use crate::error::{CacheError, StorageError};
use crate::storage::{MemoryBackend, PersistenceAdapter, StorageBackend};

// == Test Configuration ==
const TEST_DEFAULT_TTL: u64 = 300;

// == Strategies ==
/// Generates URL-like cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "/[a-z]{1,8}(/[0-9]{1,4})?".prop_map(|s| s)
}

/// Generates JSON-safe payloads
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,32}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn expiry_strategy() -> impl Strategy<Value = Expiry> {
    prop_oneof![
        3 => (0u64..10_000_000).prop_map(Expiry::At),
        1 => Just(Expiry::Never),
    ]
}

fn entries_strategy(max: usize) -> impl Strategy<Value = BTreeMap<String, CacheEntry>> {
    prop::collection::btree_map(
        key_strategy(),
        (expiry_strategy(), value_strategy())
            .prop_map(|(expires_at, value)| CacheEntry { expires_at, value }),
        0..max,
    )
}

/// Backend that rejects every write and counts attempts.
#[derive(Default)]
struct AlwaysFull {
    attempts: Mutex<Vec<String>>,
}

impl StorageBackend for AlwaysFull {
    fn get_item(&self, _slot: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_item(&self, _slot: &str, value: &str) -> Result<(), StorageError> {
        self.attempts.lock().unwrap().push(value.to_string());
        Err(StorageError::QuotaExceeded)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // An entry with a TTL is usable strictly before its expiry instant and
    // never at or after it; an entry without expiry is always usable.
    #[test]
    fn prop_expiry_correctness(
        value in value_strategy(),
        ttl in prop::option::of(0u64..100_000),
        written_at in 0u64..1_000_000_000,
        offset in 0u64..200_000_000,
    ) {
        let expires = ttl.map(Expires::After);
        let entry = CacheEntry::new(value, expires, TEST_DEFAULT_TTL, written_at);
        let now = written_at + offset;

        match entry.expires_at {
            Expiry::At(at) => {
                prop_assert!(at > written_at, "Expiry must lie after the write");
                prop_assert_eq!(entry.is_usable(now), now < at);
            }
            Expiry::Never => prop_assert!(false, "TTL writes always carry an expiry"),
        }

        let forever = CacheEntry::new(json!(null), Some(Expires::Never), TEST_DEFAULT_TTL, written_at);
        prop_assert!(forever.is_usable(now));
    }

    // Persisting a store and loading it back yields the same entries.
    #[test]
    fn prop_persistence_roundtrip(entries in entries_strategy(12)) {
        let persistence = PersistenceAdapter::new(Arc::new(MemoryBackend::new()), "slot");

        persistence.save(&entries).unwrap();
        prop_assert_eq!(persistence.load(), entries.clone());

        let reopened = CacheStore::open(persistence, EvictionPolicy::new());
        prop_assert_eq!(reopened.entries(), &entries);
    }

    // Writing twice to a key keeps one entry holding the second value.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        first in value_strategy(),
        second in value_strategy(),
    ) {
        let mut store = CacheStore::in_memory();

        store.set(key.clone(), CacheEntry::new(first, None, TEST_DEFAULT_TTL, 0)).unwrap();
        store.set(key.clone(), CacheEntry::new(second.clone(), None, TEST_DEFAULT_TTL, 10)).unwrap();

        prop_assert_eq!(store.len(), 1);
        prop_assert_eq!(&store.get(&key).unwrap().value, &second);
    }

    // Against a backend that is always full, a store of N entries is evicted
    // at most N times, dated entries go first in expiry order, and the
    // operation ends with QuotaExhausted.
    #[test]
    fn prop_eviction_terminates_in_expiry_order(entries in entries_strategy(10)) {
        let backend = Arc::new(AlwaysFull::default());
        let persistence = PersistenceAdapter::new(backend.clone(), "slot");
        let mut store = CacheStore::new(persistence, EvictionPolicy::new());
        let n = entries.len();
        store.replace_all(entries.clone());

        let result = store.persist();

        prop_assert!(matches!(result, Err(CacheError::QuotaExhausted)));
        prop_assert!(store.is_empty());
        prop_assert_eq!(store.stats().evictions as usize, n);
        prop_assert_eq!(backend.attempts.lock().unwrap().len(), n + 1);

        // Reconstruct the eviction order from successive write attempts
        let snapshots: Vec<BTreeMap<String, CacheEntry>> = backend
            .attempts
            .lock()
            .unwrap()
            .iter()
            .map(|blob| serde_json::from_str(blob).unwrap())
            .collect();
        let evicted: Vec<&CacheEntry> = snapshots
            .windows(2)
            .map(|pair| {
                let gone: Vec<&String> = pair[0].keys().filter(|k| !pair[1].contains_key(*k)).collect();
                assert_eq!(gone.len(), 1);
                &entries[gone[0]]
            })
            .collect();

        for pair in evicted.windows(2) {
            match (pair[0].expires_at, pair[1].expires_at) {
                (Expiry::At(a), Expiry::At(b)) => prop_assert!(a <= b),
                (Expiry::Never, Expiry::At(_)) => prop_assert!(false, "Undated entry evicted before a dated one"),
                _ => {}
            }
        }
    }

    // When the quota is large enough for the newest entry alone, a write
    // always succeeds and the new entry survives.
    #[test]
    fn prop_eviction_makes_room_for_new_entry(
        entries in prop::collection::vec((key_strategy(), "[a-z]{10,40}"), 1..20),
    ) {
        let persistence = PersistenceAdapter::new(Arc::new(MemoryBackend::with_quota(400)), "slot");
        let mut store = CacheStore::new(persistence, EvictionPolicy::new());

        for (i, (key, text)) in entries.into_iter().enumerate() {
            let entry = CacheEntry::new(json!(text), Some(Expires::After(60)), TEST_DEFAULT_TTL, i as u64 * 1000);
            prop_assert!(store.set(key.clone(), entry).is_ok());
            prop_assert!(store.get(&key).is_some(), "Newest entry must survive eviction");
        }
    }
}
