//! Key-value backends the store persists into

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by a backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Synchronous string-keyed storage
pub trait KeyValueStore {
    /// Value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: String) -> Result<(), BackendError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), BackendError> {
        (**self).set(key, value)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), BackendError> {
        (**self).set(key, value)
    }
}

/// In-process map; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `key`, returning its value
    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), BackendError> {
        self.entries().insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON object on disk mapping keys to values
///
/// Writes take an exclusive lock on a sibling `.lock` file and replace the
/// store file through a temp file in the same directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Open the store file at `path`; the file is created on first write
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        debug!(?path, "Opened file store");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.dir().join(name)
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, BackendError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|source| BackendError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entry(&self, key: &str, value: String) -> Result<(), BackendError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value);

        let mut tmp = NamedTempFile::new_in(self.dir())?;
        serde_json::to_writer_pretty(&mut tmp, &entries)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), BackendError> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&lock)?;
        let result = self.write_entry(key, value);
        if let Err(e) = FileExt::unlock(&lock) {
            warn!(path = ?self.path, error = %e, "Failed to unlock file store");
        }
        if result.is_ok() {
            debug!(path = ?self.path, key, "Wrote file store entry");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_clones_share_entries() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v".to_string()).unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(b.len(), 1);
        assert_eq!(b.remove("k").as_deref(), Some("v"));
        assert!(a.is_empty());
    }

    #[test]
    fn test_mut_ref_delegates() {
        let mut store = MemoryStore::new();
        {
            let mut by_ref = &mut store;
            KeyValueStore::set(&mut by_ref, "k", "v".to_string()).unwrap();
        }
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("missing").unwrap(), None);
        store.set("a", "1*+".to_string()).unwrap();
        store.set("b", "=@\u{7f}".to_string()).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1*+"));
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("=@\u{7f}"));
        assert!(temp.path().join("nested").join("store.json.lock").exists());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(store.get("a"), Err(BackendError::Corrupt { .. })));
    }

    #[test]
    fn test_file_store_write_error_is_returned() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        // a directory where the store file should be
        fs::create_dir(&path).unwrap();

        let mut store = FileStore::open(&path).unwrap();
        assert!(matches!(store.set("a", "1".to_string()), Err(BackendError::Io(_))));

        // the lock was released, so a later write goes through
        fs::remove_dir(&path).unwrap();
        store.set("a", "1".to_string()).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_file_store_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        fs::write(&path, "").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }
}
