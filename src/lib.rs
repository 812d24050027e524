//! Fetch Cache - A client-side response cache for URL-addressed resources
//!
//! Serves previously fetched payloads with TTL expiry, supports
//! prefill-then-refresh, and persists the cache to quota-limited storage.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod storage;

pub use cache::{CacheEntry, CacheStore, EvictionPolicy, Expires, Expiry};
pub use config::Config;
pub use error::{CacheError, FetchError, ResourceError, StorageError};
pub use fetch::{FetchInterceptor, FetchOptions, HttpFetcher, LiveFetch, Resource, Served};
pub use storage::{FileBackend, MemoryBackend, PersistenceAdapter, StorageBackend};
