//! Persistent key-value slots for client-side state.
//!
//! The cart lives in a single named slot that is read once at start-up and
//! overwritten wholesale after every mutation. Two backends are provided:
//! an in-memory map (tests, embedding) and a directory of JSON files (the
//! terminal front end).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Reading a persisted slot failed.
///
/// Never fatal: the cart store treats it as an empty cart.
#[derive(Debug, Error)]
pub enum StorageReadError {
    /// The backend could not be read.
    #[error("failed to read storage slot {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The slot exists but does not hold a valid cart.
    #[error("storage slot {key} holds unparsable data: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend is in an unusable state.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Writing a slot failed.
#[derive(Debug, Error)]
pub enum StorageWriteError {
    /// The backend could not be written.
    #[error("failed to write storage slot {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The value could not be encoded for the slot.
    #[error("failed to encode storage slot {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend is in an unusable state.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value store with whole-value reads and writes.
pub trait KeyValueStore {
    /// Read a slot. `Ok(None)` means the slot was never written.
    ///
    /// # Errors
    ///
    /// Returns `StorageReadError` if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageReadError>;

    /// Replace the contents of a slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageWriteError` if the backend cannot be written.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageWriteError>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one pre-populated slot.
    #[must_use]
    pub fn with_slot(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut slots) = store.slots.write() {
            slots.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageReadError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| StorageReadError::Unavailable("Lock poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageWriteError> {
        self.slots
            .write()
            .map_err(|_| StorageWriteError::Unavailable("Lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// One JSON file per slot inside a directory.
///
/// Writes go to a temporary file that is then renamed over the slot, so a
/// crash mid-write leaves the previous contents intact.
///
/// I/O is blocking `std::fs`, matching the synchronous [`KeyValueStore`]
/// contract: a slot is a single small file touched once per cart change.
/// Callers on a shared async runtime should wrap mutations in
/// `tokio::task::spawn_blocking`; the one-shot CLI calls it inline.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` for slot files. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageReadError> {
        match std::fs::read_to_string(self.slot_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageReadError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageWriteError> {
        let io_err = |source| StorageWriteError::Io {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let path = self.slot_path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}
