//! Cache of rebuilt archives.
//!
//! Entries are keyed by the normalized path of the original archive and tagged with
//! the fingerprint of the inputs they were built from. A lookup with a different
//! fingerprint rebuilds and replaces the entry.

use crate::error::Result;
use crate::rebuild::EmulatedArchive;
use crate::utils::normalize_path_key;
use camino::Utf8Path;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct CachedArchive {
    fingerprint: u64,
    archive: Arc<EmulatedArchive>,
}

/// Thread-safe map from original archive path to its rebuilt form.
#[derive(Debug, Default)]
pub struct EmulatorCache {
    entries: Mutex<HashMap<String, CachedArchive>>,
}

impl EmulatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached archive for `path` if it was built with `fingerprint`,
    /// otherwise run `build` and cache its result.
    ///
    /// The lock is held while building, so concurrent requests for the same inputs
    /// build once. A failed build leaves any previous entry untouched.
    pub fn get_or_build<F>(
        &self,
        path: &Utf8Path,
        fingerprint: u64,
        build: F,
    ) -> Result<Arc<EmulatedArchive>>
    where
        F: FnOnce() -> Result<EmulatedArchive>,
    {
        let key = normalize_path_key(path);
        let mut entries = self.entries.lock();

        if let Some(cached) = entries.get(&key) {
            if cached.fingerprint == fingerprint {
                tracing::debug!("Emulator cache hit: {}", key);
                return Ok(cached.archive.clone());
            }
            tracing::debug!(
                "Emulator cache stale: {} (fingerprint {:016x} -> {:016x})",
                key,
                cached.fingerprint,
                fingerprint
            );
        } else {
            tracing::debug!("Emulator cache miss: {}", key);
        }

        let archive = Arc::new(build()?);
        entries.insert(
            key,
            CachedArchive {
                fingerprint,
                archive: archive.clone(),
            },
        );
        Ok(archive)
    }

    /// The cached archive for `path`, regardless of fingerprint.
    pub fn get(&self, path: &Utf8Path) -> Option<Arc<EmulatedArchive>> {
        self.entries
            .lock()
            .get(&normalize_path_key(path))
            .map(|cached| cached.archive.clone())
    }

    /// Drop the entry for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: &Utf8Path) -> bool {
        self.entries.lock().remove(&normalize_path_key(path)).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
