//! Fetch Interceptor Module
//!
//! Decides per call whether to answer from the cache, prefill then refresh,
//! or fetch live, and records successful live payloads in the cache.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::cache::{CacheEntry, CacheStats, CacheStore, Clock, Expires, SystemClock, DEFAULT_TTL_SECS};
use crate::config::Config;
use crate::error::FetchError;
use crate::fetch::{restore, ApplyMode, FetchOptions, Resource};

// == Live Fetch Trait ==
/// The network side of a fetch.
#[async_trait]
pub trait LiveFetch: Send + Sync {
    /// Fetches `url`, applies the response to `resource` through its own
    /// parse/apply pathway, and returns the raw payload.
    ///
    /// `url` is the identity the interceptor resolved for this call, which is
    /// also the cache key; `None` when the resource has no identity.
    async fn perform(
        &self,
        url: Option<&str>,
        resource: &mut dyn Resource,
        mode: ApplyMode,
    ) -> Result<Value, FetchError>;
}

// == Served ==
/// Where the final state of a fetched resource came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// A usable cached value; no live fetch happened
    Cache,
    /// A live fetch, with no cached value applied first
    Network,
    /// A cached value was applied first, then replaced by a live fetch
    Refreshed,
}

// == Fetch Interceptor ==
/// Per-resource entry point in front of a [`LiveFetch`].
///
/// The store is shared: clone the `Arc` to hand the same cache to several
/// interceptors.
pub struct FetchInterceptor<F> {
    store: Arc<RwLock<CacheStore>>,
    fetcher: F,
    clock: Arc<dyn Clock>,
    default_ttl: u64,
}

impl<F: LiveFetch> FetchInterceptor<F> {
    // == Constructor ==
    pub fn new(store: Arc<RwLock<CacheStore>>, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            clock: Arc::new(SystemClock),
            default_ttl: DEFAULT_TTL_SECS,
        }
    }

    pub fn from_config(config: &Config, store: Arc<RwLock<CacheStore>>, fetcher: F) -> Self {
        Self::new(store, fetcher).with_default_ttl(config.default_ttl)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_ttl(mut self, secs: u64) -> Self {
        self.default_ttl = secs;
        self
    }

    pub fn store(&self) -> &Arc<RwLock<CacheStore>> {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Fetch ==
    /// Fetches `resource`, consulting the cache when `options` opt in.
    ///
    /// - `cache` with a usable entry: the cached value is applied, the
    ///   `prefill_success` and `success` callbacks run, and no live fetch happens.
    /// - `prefill` with a usable entry: the cached value is applied,
    ///   `prefill_success` and `progress` run, then the live fetch proceeds.
    /// - Otherwise the live fetch runs; its payload is cached on success.
    ///
    /// A resource without identity is fetched live and never cached.
    /// Only live-fetch failures are returned as errors.
    pub async fn fetch<R: Resource>(
        &self,
        resource: &mut R,
        mut options: FetchOptions<R>,
    ) -> Result<Served, FetchError> {
        let key = resource.identity().resolve();
        let mode = options.apply_mode();
        let mut prefilled = false;

        if let (Some(key), true) = (key.as_deref(), options.wants_cache()) {
            let now = self.clock.now_ms();
            let cached = self.store.write().await.lookup(key, now);

            if let Some(value) = cached {
                match restore(resource, &value, mode) {
                    Ok(()) => {
                        if let Some(callback) = options.prefill_success.take() {
                            callback(&*resource);
                        }

                        if !options.prefill {
                            debug!("Cache hit for {}", key);
                            if let Some(callback) = options.success.take() {
                                callback(&*resource);
                            }
                            return Ok(Served::Cache);
                        }

                        debug!("Prefilled {} from cache, refreshing", key);
                        self.store.write().await.record_prefill();
                        if let Some(progress) = options.progress.as_mut() {
                            progress(&*resource);
                        }
                        prefilled = true;
                    }
                    Err(e) => warn!("Cached value for {} rejected, fetching live: {}", key, e),
                }
            } else {
                debug!("Cache miss for {}", key);
            }
        }

        match self.fetcher.perform(key.as_deref(), &mut *resource, mode).await {
            Ok(payload) => {
                if let Some(key) = key {
                    self.write(key, payload, options.expires).await;
                }
                if let Some(callback) = options.success.take() {
                    callback(&*resource);
                }
                Ok(if prefilled { Served::Refreshed } else { Served::Network })
            }
            Err(e) => {
                debug!("Live fetch failed: {}", e);
                if let Some(callback) = options.error.take() {
                    callback(&e);
                }
                Err(e)
            }
        }
    }

    /// Records a live payload. Persistence failures are logged, not returned.
    ///
    /// Storage backends may block, so the write runs on the blocking pool.
    async fn write(&self, key: String, payload: Value, expires: Option<Expires>) {
        let entry = CacheEntry::new(payload, expires, self.default_ttl, self.clock.now_ms());
        let store = Arc::clone(&self.store);
        let written = tokio::task::spawn_blocking(move || {
            let result = store.blocking_write().set(key.clone(), entry);
            (key, result)
        })
        .await;

        match written {
            Ok((_, Ok(()))) => {}
            Ok((key, Err(e))) => error!("Failed to persist cache after writing {}: {}", key, e),
            Err(e) => error!("Cache write task failed: {}", e),
        }
    }
}
