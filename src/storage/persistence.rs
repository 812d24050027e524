//! Persistence Adapter Module
//!
//! Serializes the whole cache to a single slot of a storage backend and
//! reads it back at start-up.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::CacheEntry;
use crate::config::Config;
use crate::error::Result;
use crate::storage::StorageBackend;

/// Slot name used when none is configured.
pub const DEFAULT_SLOT: &str = "fetchCache";

// == Persistence Adapter ==
/// Owns the single persistence slot for a cache.
///
/// When the backend is unavailable or persistence is disabled, `save` always
/// succeeds and `load` always returns an empty map.
#[derive(Clone)]
pub struct PersistenceAdapter {
    backend: Option<Arc<dyn StorageBackend>>,
    slot: String,
}

impl PersistenceAdapter {
    // == Constructor ==
    /// Creates an adapter writing to `slot` on `backend`.
    ///
    /// Backend availability is queried once, here.
    pub fn new(backend: Arc<dyn StorageBackend>, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let backend = if backend.is_available() {
            Some(backend)
        } else {
            warn!("Storage backend unavailable, cache persistence disabled");
            None
        };
        Self { backend, slot }
    }

    /// Creates an adapter that never touches storage.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            slot: DEFAULT_SLOT.to_string(),
        }
    }

    /// Creates an adapter honouring the configured toggle and slot name.
    pub fn from_config(config: &Config, backend: Arc<dyn StorageBackend>) -> Self {
        if config.persist {
            Self::new(backend, config.slot.clone())
        } else {
            debug!("Cache persistence disabled by configuration");
            Self::disabled()
        }
    }

    pub fn is_active(&self) -> bool {
        self.backend.is_some()
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    // == Save ==
    /// Writes every entry as one JSON object under the slot.
    ///
    /// Quota rejections come back as `CacheError::Storage(QuotaExceeded)` for
    /// the caller to act on.
    pub fn save(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let blob = serde_json::to_string(entries)?;
        backend.set_item(&self.slot, &blob)?;
        debug!("Persisted {} entries ({} bytes)", entries.len(), blob.len());
        Ok(())
    }

    // == Load ==
    /// Reads the slot; missing, unreadable or corrupt content yields an empty map.
    pub fn load(&self) -> BTreeMap<String, CacheEntry> {
        let Some(backend) = &self.backend else {
            return BTreeMap::new();
        };

        let blob = match backend.get_item(&self.slot) {
            Ok(Some(blob)) => blob,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read persisted cache: {}", e);
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Discarding corrupt persisted cache: {}", e);
                BTreeMap::new()
            }
        }
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("slot", &self.slot)
            .field("active", &self.is_active())
            .finish()
    }
}
