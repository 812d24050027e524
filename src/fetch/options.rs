//! Fetch Options Module
//!
//! Per-call switches and callbacks accepted by the interceptor.

use std::fmt;

use crate::cache::Expires;
use crate::error::FetchError;
use crate::fetch::ApplyMode;

/// Called with the resource once, e.g. when a cached value has been applied.
pub type ResourceCallback<R> = Box<dyn FnOnce(&R) + Send>;

/// Called with the resource for each intermediate progress signal.
pub type ProgressCallback<R> = Box<dyn FnMut(&R) + Send>;

/// Called with the failure of a live fetch.
pub type ErrorCallback = Box<dyn FnOnce(&FetchError) + Send>;

// == Fetch Options ==
/// Options for a single [`FetchInterceptor::fetch`](crate::fetch::FetchInterceptor::fetch) call.
///
/// The cache is opt-in per call: without `cache` or `prefill` a usable entry
/// is ignored and a live fetch always happens.
pub struct FetchOptions<R> {
    /// Serve a usable cached value and stop
    pub cache: bool,
    /// Serve a usable cached value, then refresh from the network
    pub prefill: bool,
    /// Lifetime of the entry written after a live fetch (`None` = default TTL)
    pub expires: Option<Expires>,
    /// Record sets only: append instead of replacing contents
    pub add: bool,
    /// Invoked right after a cached value is applied
    pub prefill_success: Option<ResourceCallback<R>>,
    /// Invoked when a prefilled resource is waiting on its refresh
    pub progress: Option<ProgressCallback<R>>,
    /// Invoked when the call succeeds
    pub success: Option<ResourceCallback<R>>,
    /// Invoked when the live fetch fails
    pub error: Option<ErrorCallback>,
}

impl<R> FetchOptions<R> {
    /// Options for a plain live fetch.
    pub fn new() -> Self {
        Self {
            cache: false,
            prefill: false,
            expires: None,
            add: false,
            prefill_success: None,
            progress: None,
            success: None,
            error: None,
        }
    }

    /// Options serving from the cache when possible.
    pub fn cached() -> Self {
        Self::new().with_cache(true)
    }

    /// Options prefilling from the cache, then refreshing.
    pub fn prefilled() -> Self {
        Self::new().with_prefill(true)
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_prefill(mut self, prefill: bool) -> Self {
        self.prefill = prefill;
        self
    }

    pub fn with_expires(mut self, expires: Expires) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_add(mut self, add: bool) -> Self {
        self.add = add;
        self
    }

    pub fn on_prefill_success(mut self, f: impl FnOnce(&R) + Send + 'static) -> Self {
        self.prefill_success = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl FnMut(&R) + Send + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(&R) + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&FetchError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Whether this call may be answered from the cache.
    pub fn wants_cache(&self) -> bool {
        self.cache || self.prefill
    }

    pub fn apply_mode(&self) -> ApplyMode {
        if self.add {
            ApplyMode::Add
        } else {
            ApplyMode::Replace
        }
    }
}

impl<R> Default for FetchOptions<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for FetchOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("cache", &self.cache)
            .field("prefill", &self.prefill)
            .field("expires", &self.expires)
            .field("add", &self.add)
            .field("prefill_success", &self.prefill_success.is_some())
            .field("progress", &self.progress.is_some())
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
