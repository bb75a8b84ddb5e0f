use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use tempfile::NamedTempFile;

use crate::codec;
use crate::error::LibraryError;
use crate::index::LibraryIndex;

/// A [`LibraryIndex`] shared between the loader threads and any number of
/// readers. Guards are scoped; do not hold one across blocking work.
#[derive(Debug, Default)]
pub struct SharedLibrary {
    index: RwLock<LibraryIndex>,
    finished_loading_from_cache: AtomicBool,
    abort_requested: AtomicBool,
}

impl SharedLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: LibraryIndex) -> Self {
        Self {
            index: RwLock::new(index),
            ..Self::default()
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, LibraryIndex> {
        self.index.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, LibraryIndex> {
        self.index.write()
    }

    pub fn has_finished_loading_from_cache(&self) -> bool {
        self.finished_loading_from_cache.load(Ordering::Acquire)
    }

    pub fn set_finished_loading_from_cache(&self) {
        self.finished_loading_from_cache.store(true, Ordering::Release);
    }

    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::Release);
    }

    pub fn is_abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::Acquire)
    }

    pub(crate) fn clear_abort(&self) {
        self.abort_requested.store(false, Ordering::Release);
    }

    /// Writes the index to `path` when it has unsaved changes. Refuses to
    /// write before the previous cache has been merged in, so a partially
    /// loaded index never replaces a complete cache. Returns whether a file
    /// was written.
    pub fn save_to_cache(&self, path: &Path) -> Result<bool, LibraryError> {
        if !self.has_finished_loading_from_cache() {
            return Ok(false);
        }

        // Readers keep going while the snapshot is encoded; writers wait so
        // the dirty flag can be cleared for exactly this state.
        let bytes = {
            let index = self.index.upgradable_read();
            if !index.is_modified() {
                return Ok(false);
            }
            let bytes = codec::save_to_vec(&index)?;
            let mut index = RwLockUpgradableReadGuard::upgrade(index);
            index.mark_saved();
            bytes
        };

        if let Err(err) = write_atomically(path, &bytes) {
            self.write().mark_modified();
            return Err(err);
        }
        Ok(true)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), LibraryError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| LibraryError::Io(err.error))?;
    Ok(())
}
