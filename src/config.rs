//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::DEFAULT_TTL_SECS;
use crate::storage::{FileBackend, DEFAULT_SLOT};

/// Default persistent storage quota, in bytes (browser-storage scale).
pub const DEFAULT_STORAGE_QUOTA: u64 = 5 * 1024 * 1024;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the cache is persisted to storage at all
    pub persist: bool,
    /// Default TTL in seconds for writes without an explicit expiry
    pub default_ttl: u64,
    /// Name of the storage slot holding the serialized cache
    pub slot: String,
    /// Directory used by the file storage backend
    pub cache_dir: PathBuf,
    /// Maximum size in bytes of the persisted cache
    pub storage_quota: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PERSIST_CACHE` - Enable persistence (default: true)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_SLOT` - Persistence slot name (default: fetchCache)
    /// - `CACHE_DIR` - Storage directory (default: platform cache dir)
    /// - `STORAGE_QUOTA` - Storage quota in bytes (default: 5 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            persist: env::var("PERSIST_CACHE")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.persist),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.default_ttl),
            slot: env::var("CACHE_SLOT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.slot),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            storage_quota: env::var("STORAGE_QUOTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.storage_quota),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persist: true,
            default_ttl: DEFAULT_TTL_SECS,
            slot: DEFAULT_SLOT.to_string(),
            cache_dir: FileBackend::default_dir().unwrap_or_else(|| PathBuf::from(".fetch_cache")),
            storage_quota: DEFAULT_STORAGE_QUOTA,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
