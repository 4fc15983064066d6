//! State storage backends
//!
//! A backend holds one serialized state blob under a namespaced key.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::StorageError;

/// Key/value slot holding the serialized state envelope
pub trait StateStorage: Send + Sync {
    /// Read the stored blob, if any
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored blob
    fn save(&self, contents: &str) -> Result<(), StorageError>;

    /// Forget the stored blob
    fn clear(&self) -> Result<(), StorageError>;
}

/// Stores state as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a file store for the given directory and key
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self {
            path: dir.as_ref().join(format!("{}.json", sanitized)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store (tests, throwaway sessions)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    contents: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing blob
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    /// Current blob, for inspection
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents.lock().clone())
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        *self.contents.lock() = Some(contents.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.contents.lock() = None;
        Ok(())
    }
}

impl<T: StateStorage + ?Sized> StateStorage for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>, StorageError> {
        (**self).load()
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        (**self).save(contents)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}
