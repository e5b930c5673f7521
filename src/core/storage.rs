//! Key-value persistence used by the credential and chat stores.
//!
//! Every persisted unit (the credential pair, the session summary list, and
//! each session's message list) lives under its own key so that reading one
//! never requires touching the others. Values are UTF-8 JSON.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keyring::Entry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::core::config::data::path_display;

const KEYRING_SERVICE: &str = "nova";

/// Failures raised by a [`KeyValueStore`] or while (de)serializing values.
#[derive(Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    Io { key: String, source: io::Error },
    /// The stored bytes were not the JSON shape the caller expected.
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
    /// A value could not be encoded to JSON.
    Encode {
        key: String,
        source: serde_json::Error,
    },
    /// The platform keyring refused the request.
    ///
    /// Recoverable errors indicate the backend was temporarily unavailable
    /// (for example a locked keychain).
    Keyring {
        key: String,
        recoverable: bool,
        source: keyring::Error,
    },
}

impl StorageError {
    fn keyring(key: &str, source: keyring::Error) -> Self {
        let recoverable = matches!(
            source,
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_)
        );
        StorageError::Keyring {
            key: key.to_string(),
            recoverable,
            source,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            StorageError::Io { key, .. }
            | StorageError::Corrupt { key, .. }
            | StorageError::Encode { key, .. }
            | StorageError::Keyring { key, .. } => key,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::Corrupt { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { key, source } => {
                write!(f, "Failed to access stored value '{key}': {source}")
            }
            StorageError::Corrupt { key, source } => {
                write!(f, "Stored value '{key}' is not valid JSON: {source}")
            }
            StorageError::Encode { key, source } => {
                write!(f, "Failed to encode value '{key}': {source}")
            }
            StorageError::Keyring { key, source, .. } => {
                write!(f, "Keyring access for '{key}' failed: {source}")
            }
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Corrupt { source, .. } | StorageError::Encode { source, .. } => {
                Some(source)
            }
            StorageError::Keyring { source, .. } => Some(source),
        }
    }
}

/// Minimal persistence interface the stores are written against.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value. Missing keys yield `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &bytes)
}

/// In-process store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map still holds consistent bytes; keep using it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }

    fn io_error(key: &str, source: io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|err| Self::io_error(key, err))?;
        let target = self.path_for(key);
        let mut temp_file =
            NamedTempFile::new_in(&self.root).map_err(|err| Self::io_error(key, err))?;
        temp_file
            .write_all(value)
            .and_then(|_| temp_file.as_file_mut().sync_all())
            .map_err(|err| Self::io_error(key, err))?;
        temp_file
            .persist(&target)
            .map_err(|err| Self::io_error(key, err.error))?;
        tracing::debug!(key, path = %path_display(&target), "Persisted value");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }
}

/// Values held in the system keyring, one entry per key.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(key: &str) -> Result<Entry, StorageError> {
        Entry::new(KEYRING_SERVICE, key).map_err(|err| StorageError::keyring(key, err))
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match Self::entry(key)?.get_password() {
            Ok(value) => Ok(Some(value.into_bytes())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(StorageError::keyring(key, err)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let text = String::from_utf8_lossy(value);
        Self::entry(key)?
            .set_password(&text)
            .map_err(|err| StorageError::keyring(key, err))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StorageError::keyring(key, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn memory_store_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("k", b"value").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"value"[..]));

        store.delete("k").unwrap();
        assert!(store.is_empty());
        store.delete("k").expect("deleting twice is fine");
    }

    #[test]
    fn read_json_reports_corrupt_values() {
        let store = MemoryStore::new();
        store.set("broken", b"{not json").unwrap();

        let err = read_json::<Sample>(&store, "broken").unwrap_err();
        assert!(err.is_corrupt());
        assert_eq!(err.key(), "broken");
    }

    #[test]
    fn json_helpers_preserve_values() {
        let store = MemoryStore::new();
        let sample = Sample {
            name: "alpha".to_string(),
            count: 3,
        };
        write_json(&store, "sample", &sample).unwrap();

        let loaded: Option<Sample> = read_json(&store, "sample").unwrap();
        assert_eq!(loaded, Some(sample));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path().join("data"));
        store.set("chat_sessions", b"[]").unwrap();

        let reopened = FileStore::new(temp_dir.path().join("data"));
        assert_eq!(
            reopened.get("chat_sessions").unwrap().as_deref(),
            Some(&b"[]"[..])
        );
        assert!(temp_dir.path().join("data/chat_sessions.json").exists());
    }

    #[test]
    fn file_store_sanitizes_keys_and_ignores_missing_deletes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path());
        store.set("../escape", b"1").unwrap();

        assert!(temp_dir.path().join("___escape.json").exists());
        assert_eq!(store.get("never-written").unwrap(), None);
        store.delete("never-written").unwrap();
    }
}
