//! Storage Module
//!
//! Key/value storage backends and the adapter that persists the cache into them.

mod backend;
mod file;
mod persistence;

pub use backend::{MemoryBackend, StorageBackend};
pub use file::FileBackend;
pub use persistence::{PersistenceAdapter, DEFAULT_SLOT};
