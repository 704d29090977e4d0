//! Durable key-value stores.
//!
//! [`JsonFileStore`] keeps every fact in one small JSON object on disk and
//! rewrites it atomically (temp file then rename) on each change, so a crash
//! mid-write leaves the previous contents intact. Hosts should place the file
//! in storage that is readable before the user unlocks the device.

use crate::error::PlatformError;
use crate::platform::KeyValueStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// File-backed store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`, reading any existing contents.
    ///
    /// A missing file is an empty store. A malformed file is logged and
    /// treated as empty; it is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PlatformError> {
        let path = path.into();
        let entries = read_entries(&path)?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), PlatformError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PlatformError::Other(format!("cannot create state directory: {e}"))
            })?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| PlatformError::Other(format!("cannot serialize state: {e}")))?;
        std::fs::write(&tmp_path, json)
            .map_err(|e| PlatformError::Other(format!("cannot write state temp file: {e}")))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| PlatformError::Other(format!("cannot finalize state file: {e}")))?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, PlatformError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(PlatformError::Unavailable(format!(
                "cannot read state file {}: {e}",
                path.display()
            )));
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!("ignoring malformed state file at {}: {e}", path.display());
            Ok(BTreeMap::new())
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PlatformError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).is_some_and(|v| v == value) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.insert(key.to_owned(), value.to_owned());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PlatformError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PlatformError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PlatformError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
