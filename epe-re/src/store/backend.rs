//! Durable storage behind the record store
//!
//! The store hands each collection over as one JSON value; backends only
//! know how to load and replace a whole collection.

use epe_common::{Error, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// The three persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Witnesses,
    Annotations,
    AlignmentGroups,
}

impl Collection {
    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Witnesses => "witnesses.json",
            Collection::Annotations => "annotations.json",
            Collection::AlignmentGroups => "alignment_groups.json",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Whole-collection load/replace
pub trait StorageBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet
    fn load(&self, collection: Collection) -> Result<Option<Value>>;

    /// Replace the stored collection; returns only once the write is durable
    fn save(&self, collection: Collection, value: &Value) -> Result<()>;
}

/// One pretty-printed JSON file per collection inside a data folder
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    root: PathBuf,
}

impl JsonDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.file_name())
    }

    /// Move an unreadable file out of the way so the next save does not
    /// overwrite the only copy of it.
    fn quarantine(&self, path: &Path) -> Result<PathBuf> {
        let mut target = path.as_os_str().to_owned();
        target.push(".corrupt");
        let target = PathBuf::from(target);
        std::fs::rename(path, &target)?;
        Ok(target)
    }
}

impl StorageBackend for JsonDirectory {
    fn load(&self, collection: Collection) -> Result<Option<Value>> {
        let path = self.path_for(collection);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not present, starting empty", path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let moved = self.quarantine(&path)?;
                warn!(
                    "{} is not valid JSON ({}); moved to {} and starting empty",
                    path.display(),
                    e,
                    moved.display()
                );
                Ok(None)
            }
        }
    }

    fn save(&self, collection: Collection, value: &Value) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;

        let path = self.path_for(collection);
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let text = serde_json::to_string_pretty(value)?;
        std::fs::write(&tmp, text.as_bytes())?;
        std::fs::rename(&tmp, &path)?;

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// In-process backend for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: Mutex<HashMap<Collection, Value>>,
    failing: Mutex<HashSet<Collection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection as if it had been persisted earlier
    pub fn with_collection(self, collection: Collection, value: Value) -> Self {
        if let Ok(mut map) = self.collections.lock() {
            map.insert(collection, value);
        }
        self
    }

    /// Make every subsequent save of `collection` fail until cleared
    pub fn fail_saves(&self, collection: Collection, failing: bool) {
        if let Ok(mut set) = self.failing.lock() {
            if failing {
                set.insert(collection);
            } else {
                set.remove(&collection);
            }
        }
    }

    /// Current persisted value of a collection
    pub fn stored(&self, collection: Collection) -> Option<Value> {
        self.collections
            .lock()
            .ok()
            .and_then(|map| map.get(&collection).cloned())
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, collection: Collection) -> Result<Option<Value>> {
        let map = self
            .collections
            .lock()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))?;
        Ok(map.get(&collection).cloned())
    }

    fn save(&self, collection: Collection, value: &Value) -> Result<()> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))?
            .contains(&collection);
        if failing {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::Other,
                format!("simulated write failure for {}", collection),
            )));
        }

        let mut map = self
            .collections
            .lock()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))?;
        map.insert(collection, value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_json_directory_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let backend = JsonDirectory::new(temp_dir.path());
        assert!(backend.load(Collection::Witnesses).unwrap().is_none());
    }

    #[test]
    fn test_json_directory_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let backend = JsonDirectory::new(temp_dir.path().join("data"));

        let value = json!([{"id": "w1", "label": "Ṭabarī"}]);
        backend.save(Collection::Witnesses, &value).unwrap();

        assert_eq!(backend.load(Collection::Witnesses).unwrap(), Some(value));
        assert!(!temp_dir
            .path()
            .join("data")
            .join("witnesses.json.tmp")
            .exists());
    }

    #[test]
    fn test_json_directory_quarantines_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let backend = JsonDirectory::new(temp_dir.path());
        std::fs::write(backend.path_for(Collection::Annotations), "[{broken").unwrap();

        assert!(backend.load(Collection::Annotations).unwrap().is_none());
        assert!(temp_dir.path().join("annotations.json.corrupt").exists());
        assert!(!backend.path_for(Collection::Annotations).exists());
    }

    #[test]
    fn test_memory_backend_failure_injection() {
        let backend = MemoryBackend::new();
        backend.fail_saves(Collection::Annotations, true);
        assert!(backend.save(Collection::Annotations, &json!([])).is_err());
        assert!(backend.save(Collection::Witnesses, &json!([])).is_ok());

        backend.fail_saves(Collection::Annotations, false);
        assert!(backend.save(Collection::Annotations, &json!([])).is_ok());
        assert_eq!(backend.stored(Collection::Annotations), Some(json!([])));
    }
}
