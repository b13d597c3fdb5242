//! Persisted key-value storage for the bearer token.
//!
//! The controller persists exactly one value, the token, under
//! [`SessionConfig::token_key`](crate::SessionConfig::token_key), so a
//! restarted client can restore its session. Identity and role are never
//! persisted; they are re-derived from the gateway on restart.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use groundwork_protocol::{Codec, JsonCodec};

use crate::SessionError;

/// Minimal string key-value storage.
///
/// Implementations are synchronous: the controller touches the store
/// for one key at the end of a transition, and every real backing
/// (browser storage, a small file, an OS keyring) answers immediately.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Reads a value. `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Deletes a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove(key)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store. Clones share the same map, so a test can hand one
/// clone to the controller and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one entry, e.g. a token left
    /// behind by a previous run.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        lock(&store.entries).insert(key.into(), value.into());
        store
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Store backed by a single JSON object on disk.
///
/// The whole map is rewritten on every mutation (write to a sibling
/// temp file, then rename), so a crash mid-write leaves either the old
/// or the new file, never a truncated one. A missing file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or prepares to create) the store at `path`.
    ///
    /// # Errors
    /// [`SessionError::Storage`] if the file exists but can't be read,
    /// [`SessionError::Protocol`] if it isn't a JSON string map.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => JsonCodec.decode(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(storage_error(&path, &e)),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let bytes = JsonCodec.encode(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|e| storage_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, &e))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> SessionError {
    SessionError::Storage(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fresh path under the system temp dir, unique per test.
    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "groundwork-store-{}-{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.json");
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "t1").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("t1"));

        store.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("token").is_ok());
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::with_entry("token", "t1");
        let other = store.clone();

        other.remove("token").unwrap();

        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let path = temp_path("missing");
        let store = FileStore::open(&path).unwrap();

        assert_eq!(store.get("token").unwrap(), None);
        assert!(!path.exists(), "open alone must not create the file");
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let path = temp_path("reopen");
        {
            let store = FileStore::open(&path).unwrap();
            store.set("token", "t1").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();

        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("t1"));
    }

    #[test]
    fn test_file_store_remove_persists() {
        let path = temp_path("remove");
        let store = FileStore::open(&path).unwrap();
        store.set("token", "t1").unwrap();

        store.remove("token").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file_returns_protocol_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, b"not json").unwrap();

        let result = FileStore::open(&path);

        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }
}
