//! Durable key/value backends for the credential store
//!
//! The browser build talks to `window.localStorage`; native builds persist to
//! a small JSON file. [`MemoryStore`] backs tests and short-lived processes.

use crate::codec::CodecError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised by storage backends and the credential store
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform store cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The backing file could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored value is not a valid obfuscated payload
    #[error("Stored session could not be decoded: {0}")]
    Decode(#[from] CodecError),

    /// The decoded value is not a valid session payload
    #[error("Stored session could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether the error stems from corrupted data rather than an unreachable store
    pub const fn is_corrupted(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Parse(_))
    }
}

/// A string key/value store with `localStorage` semantics
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store
///
/// Clones share the same contents, which models two tabs of one origin.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the platform store going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store disabled".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::{KeyValueStore, StorageError};
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tracing::warn;

    /// File-backed store holding every key in one JSON object
    ///
    /// Reads report an unparseable file as an I/O error; writes replace it.
    pub struct FileStore {
        path: PathBuf,
        lock: Mutex<()>,
    }

    impl FileStore {
        /// Open a store at `path`; the file is created on first write
        pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
            let path = path.into();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Self {
                path,
                lock: Mutex::new(()),
            })
        }

        fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
            match std::fs::read_to_string(&self.path) {
                Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
                Ok(content) => serde_json::from_str(&content)
                    .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e))),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
                Err(e) => Err(e.into()),
            }
        }

        fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
            let content = serde_json::to_string_pretty(entries)
                .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
            let tmp = self.path.with_extension("tmp");
            std::fs::write(&tmp, content)?;
            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
            self.lock
                .lock()
                .map_err(|_| StorageError::Unavailable("file store lock poisoned".to_string()))
        }

        /// Apply `update` and persist the result when it reports a change
        ///
        /// An unparseable file is treated as empty and rewritten.
        fn update(
            &self,
            update: impl FnOnce(&mut HashMap<String, String>) -> bool,
        ) -> Result<(), StorageError> {
            let _guard = self.lock()?;
            let (mut entries, recovered) = match self.read_all() {
                Ok(entries) => (entries, false),
                Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!(path = %self.path.display(), error = %e, "Replacing unreadable session file");
                    (HashMap::new(), true)
                }
                Err(e) => return Err(e),
            };
            if update(&mut entries) || recovered {
                self.write_all(&entries)?;
            }
            Ok(())
        }
    }

    impl KeyValueStore for FileStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            let _guard = self.lock()?;
            Ok(self.read_all()?.remove(key))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.update(|entries| {
                entries.insert(key.to_string(), value.to_string());
                true
            })
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.update(|entries| entries.remove(key).is_some())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{KeyValueStore, StorageError};
    use web_sys::Storage;

    /// `window.localStorage`, looked up on every access
    #[derive(Clone, Copy, Default)]
    pub struct BrowserStore;

    impl BrowserStore {
        pub const fn new() -> Self {
            Self
        }

        fn storage() -> Result<Storage, StorageError> {
            web_sys::window()
                .and_then(|w| w.local_storage().ok().flatten())
                .ok_or_else(|| StorageError::Unavailable("localStorage is not accessible".to_string()))
        }
    }

    impl KeyValueStore for BrowserStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Self::storage()?
                .get_item(key)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            Self::storage()?
                .set_item(key, value)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            Self::storage()?
                .remove_item(key)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }
    }
}
