//! Fetch Module
//!
//! The fetch-interception layer: resource capabilities, per-call options,
//! the interceptor itself and an HTTP live-fetch implementation.

mod http;
mod interceptor;
mod options;
mod resource;

pub use http::HttpFetcher;
pub use interceptor::{FetchInterceptor, LiveFetch, Served};
pub use options::{ErrorCallback, FetchOptions, ProgressCallback, ResourceCallback};
pub use resource::{restore, ApplyMode, Identity, Record, RecordSet, Resource};
