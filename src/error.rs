//! Error types for the fetch cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Storage Error Enum ==
/// Outcome of a failed write or read against a key/value storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend refused the write because it is full
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// The backend cannot be used in this environment
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == Cache Error Enum ==
/// Unified error type for cache store and persistence operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A cached value could not be written in the persisted format
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage backend rejected the persisted blob
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Every entry was evicted and the backend still reports it is full
    #[error("Storage quota exhausted with an empty cache")]
    QuotaExhausted,
}

impl CacheError {
    /// True when the error is a quota rejection that eviction may resolve.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::Storage(StorageError::QuotaExceeded))
    }
}

// == Resource Error Enum ==
/// A payload rejected by a resource's own parse/apply pathway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

// == Fetch Error Enum ==
/// Failure of a live fetch, the only error surfaced to `fetch` callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The resource has no URL to fetch from
    #[error("Resource has no resolvable identity")]
    MissingIdentity,

    /// The request could not be sent or the body could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server responded with status {0}")]
    Status(u16),

    /// The server payload was rejected by the resource
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
