//! Storage Backend Module
//!
//! The narrow key/value interface persistence writes through, plus an
//! in-memory implementation with a byte quota.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;

// == Storage Backend Trait ==
/// A string key/value store with a quota-exceeded failure signal.
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `slot`, if any.
    fn get_item(&self, slot: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `slot`.
    ///
    /// Returns `StorageError::QuotaExceeded` when the backend is full.
    fn set_item(&self, slot: &str, value: &str) -> Result<(), StorageError>;

    /// Whether this backend can be used at all in the current environment.
    fn is_available(&self) -> bool {
        true
    }
}

// == Memory Backend ==
/// In-process backend that enforces a total byte quota across all slots.
///
/// Usage is counted as the byte length of every slot name plus its value.
#[derive(Debug)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    available: bool,
}

impl MemoryBackend {
    /// Creates an unbounded backend.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes: None,
            available: true,
        }
    }

    /// Creates a backend that rejects writes pushing usage past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// Creates a backend that reports itself as unsupported.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Total bytes currently stored.
    pub fn used_bytes(&self) -> usize {
        self.items()
            .iter()
            .map(|(slot, value)| slot.len() + value.len())
            .sum()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, slot: &str) -> Result<Option<String>, StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable("memory backend disabled".into()));
        }
        Ok(self.items().get(slot).cloned())
    }

    fn set_item(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        if !self.available {
            return Err(StorageError::Unavailable("memory backend disabled".into()));
        }

        let mut items = self.items();
        if let Some(quota) = self.quota_bytes {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != slot)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + slot.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        items.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
