//! services/api/src/adapters/file_store.rs
//!
//! A `KeyValueStore` that keeps one JSON file per key in a data directory.
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a reader sees either the old value or the new one.
//!
//! The store is called from async handlers. File I/O runs through
//! `block_in_place` on a multi-threaded runtime so the worker's other tasks
//! move to another thread while the write syncs.

use quran_viewer_core::ports::{KeyValueStore, PortError, PortResult};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;

pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        debug!("Key/value store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PortError::Storage(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

/// Runs blocking file I/O. Outside a multi-threaded runtime it runs in place.
fn blocking<T>(io: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(io)
        }
        _ => io(),
    }
}

fn storage_error(action: &str, key: &str, e: impl std::fmt::Display) -> PortError {
    PortError::Storage(format!("Failed to {} '{}': {}", action, key, e))
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let path = self.path_for(key)?;
        match blocking(|| std::fs::read_to_string(path)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        blocking(|| {
            let mut file =
                NamedTempFile::new_in(&self.dir).map_err(|e| storage_error("write", key, e))?;
            file.write_all(value.as_bytes())
                .and_then(|_| file.as_file().sync_all())
                .map_err(|e| storage_error("write", key, e))?;
            file.persist(&path)
                .map_err(|e| storage_error("write", key, e.error))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        match blocking(|| std::fs::remove_file(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", key, e)),
        }
    }
}
