//! Durable client-side key-value storage.
//!
//! Holds the session record, user preferences and per-location weather cache
//! entries. Values are stored as strings; the typed helpers serialize through
//! serde_json so callers never handle raw JSON.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimal key-value interface over durable storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a value. Undecodable entries read as absent.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = key, error = %e, "Failed to deserialize stored value");
            None
        }
    }
}

/// Serialize and write a value.
pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let data = serde_json::to_string(value).context("Failed to serialize value for storage")?;
    store.set(key, &data)
}

/// Well-known storage keys.
pub mod keys {
    use crate::domain::location::LocationKey;

    pub const SESSION: &str = "session";
    pub const PREFERRED_GENDER: &str = "gender";
    pub const PREFERRED_LOCATION: &str = "user_preferred_location";

    /// Weather cache entry for one location bucket
    pub fn weather(location: &LocationKey) -> String {
        format!("weather:{}", location.as_str())
    }
}

/// In-process store, used by tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.write().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// The whole map is rewritten on every mutation through a temp file and a
/// rename, so a crash never leaves a half-written file behind.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let map = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if data.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&data)
                    .with_context(|| format!("Corrupt storage file {}", path.display()))?
            }
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), entries = map.len(), "File store opened");

        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(map)),
        })
    }

    fn flush(&self, map: &HashMap<String, String>) -> Result<()> {
        let data = serde_json::to_string_pretty(map).context("Failed to serialize store")?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, data)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.inner.write();
        map.insert(key.to_string(), value.to_string());
        self.flush(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.inner.write();
        if map.remove(key).is_some() {
            self.flush(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pref {
        name: String,
        level: u8,
    }

    #[test]
    fn typed_values_round_trip_through_memory_store() {
        let store = MemoryStore::new();
        let pref = Pref {
            name: "layering".to_string(),
            level: 2,
        };

        set_json(&store, "pref", &pref).unwrap();

        assert_eq!(get_json::<Pref>(&store, "pref"), Some(pref));
        assert_eq!(get_json::<Pref>(&store, "missing"), None);
    }

    #[test]
    fn undecodable_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("pref", "not json").unwrap();

        assert_eq!(get_json::<Pref>(&store, "pref"), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("gender", "womenswear").unwrap();
            store.set("token", "abc").unwrap();
            store.remove("token").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("gender").as_deref(), Some("womenswear"));
        assert_eq!(reopened.get("token"), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ broken").unwrap();

        assert!(FileStore::open(&path).is_err());
    }
}
