//! Plain key/value persistence primitive.
//!
//! One JSON object per named store, addressed by string key. Between runs
//! the desktop store's backend holds only the encrypted blob.

use crate::error::VaultResult;
use crate::fsio::write_private_file;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key/value persistence for JSON-serializable data.
pub trait KvBackend: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> VaultResult<Option<Value>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: Value) -> VaultResult<()>;

    /// Deletes a value. Returns whether it existed.
    fn delete(&self, key: &str) -> VaultResult<bool>;

    /// Lists all keys.
    fn keys(&self) -> VaultResult<Vec<String>>;

    /// Returns true if a key is present.
    fn contains(&self, key: &str) -> VaultResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns true if the store holds nothing.
    fn is_empty(&self) -> VaultResult<bool> {
        Ok(self.keys()?.is_empty())
    }
}

/// A named store persisted as one JSON file, rewritten atomically on
/// every mutation.
pub struct JsonFileBackend {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonFileBackend {
    /// Opens (or creates) `<dir>/<name>.json`.
    ///
    /// An unreadable file is moved aside to `<name>.json.corrupt` and the
    /// store starts empty.
    pub fn open(dir: &Path, name: &str) -> VaultResult<Self> {
        let path = dir.join(format!("{name}.json"));
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    let aside = path.with_extension("json.corrupt");
                    warn!(path = %path.display(), error = %e, "Unreadable store file, moving aside");
                    std::fs::rename(&path, &aside)?;
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &Map<String, Value>) -> VaultResult<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        write_private_file(&self.path, &json)?;
        Ok(())
    }
}

impl KvBackend for JsonFileBackend {
    fn get(&self, key: &str) -> VaultResult<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> VaultResult<()> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value);
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(prev) => entries.insert(key.to_string(), prev),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> VaultResult<bool> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn keys(&self) -> VaultResult<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

/// Non-persistent store for tests and dry runs.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<Map<String, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> VaultResult<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> VaultResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> VaultResult<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    fn keys(&self) -> VaultResult<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}
