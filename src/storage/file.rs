//! File Backend Module
//!
//! Keeps each slot as a file in a directory, with an optional per-slot byte quota.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StorageError;
use crate::storage::StorageBackend;

// == File Backend ==
/// Directory-backed storage; slot `name` lives at `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileBackend {
    /// Opens (creating if needed) a backend rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!("File storage opened at {}", dir.display());
        Ok(Self {
            dir,
            quota_bytes: None,
        })
    }

    /// Rejects any slot value larger than `quota_bytes`.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Platform cache directory for this crate, e.g. `~/.cache/fetch_cache`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
            .map(|p| p.join("fetch_cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        let name: String = slot
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, slot: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            if value.len() as u64 > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        // Write-then-rename so a crash never leaves a half-written slot
        let path = self.slot_path(slot);
        let tmp = path.with_extension("json.tmp");
        let written = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
