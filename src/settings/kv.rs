//! Durable key/value storage backing the settings store

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::Result;

/// Synchronous string key/value storage
pub trait KeyValueStore: Send {
    /// Read a value, `None` when the key was never written
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value durably before returning
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; missing keys are not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Key/value store persisted as one JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`
    ///
    /// A missing file starts empty. An unreadable or corrupt file is logged
    /// and also starts empty; it is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    warn!(?path, error = %e, "settings file is corrupt, starting from defaults");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(?path, error = %e, "failed to read settings file, starting from defaults");
                BTreeMap::new()
            }
        };

        debug!(?path, keys = values.len(), "settings file opened");
        Self { path, values }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file, then rename over the real one
    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panicking writer cannot leave a half-written String behind
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = JsonFileStore::open(&path);
        store.set("wakeWord", "hey aura").unwrap();
        store.set("volume", "0.5").unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("wakeWord").as_deref(), Some("hey aura"));
        assert_eq!(reopened.get("volume").as_deref(), Some("0.5"));
        assert_eq!(reopened.get("pitch"), None);
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, b"{not json").unwrap();

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get("wakeWord"), None);

        store.set("rate", "1.5").unwrap();
        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("rate").as_deref(), Some("1.5"));
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = JsonFileStore::open(&path);
        store.set("pitch", "1").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let mut store = MemoryStore::new();
        let view = store.clone();

        store.set("wakeWordEnabled", "false").unwrap();
        assert_eq!(view.get("wakeWordEnabled").as_deref(), Some("false"));

        store.remove("wakeWordEnabled").unwrap();
        store.remove("wakeWordEnabled").unwrap();
        assert_eq!(view.get("wakeWordEnabled"), None);
    }
}
