//! Persisted local store.
//!
//! A process-wide key/value persistence layer used to survive restarts,
//! mirroring what the browser shell keeps in tab-local storage. Values are
//! stored as raw strings; typed accessors go through JSON. Every write
//! rewrites the backing file. Write failures are logged and swallowed - the
//! caller never observes a persistence failure, only a missing value on the
//! next startup.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Keys written by the engines. The exact strings are part of the persisted
/// format and must stay stable across versions.
pub mod keys {
    /// Local cart line items (JSON array).
    pub const CART: &str = "cart";

    /// Cached display cart count (JSON integer).
    pub const CART_COUNT: &str = "cartCount";

    /// Raw bearer token (legacy projection of [`USER`]).
    pub const AUTH_TOKEN: &str = "authToken";

    /// Raw username (legacy projection of [`USER`]).
    pub const USERNAME: &str = "username";

    /// Raw user id (legacy projection of [`USER`]).
    pub const USER_ID: &str = "userid";

    /// Structured identity record (JSON object) - the source of truth.
    pub const USER: &str = "user";
}

/// Errors that can occur when opening the store.
///
/// Only `open` is fallible; reads and writes degrade to logging.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file exists but could not be read.
    #[error("store io error: {0}")]
    Io(#[from] io::Error),
}

/// A shared handle to the local store.
///
/// The store is mutated by the cart engine and the auth session; both hold
/// this handle. Locking is uncontended in practice - all mutation happens on
/// the UI task.
pub type SharedStore = Arc<Mutex<LocalStore>>;

/// Lock a [`SharedStore`], recovering from a poisoned mutex.
///
/// A panic while holding the lock can at worst leave a half-written entry
/// set, which the best-effort persistence contract already tolerates.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, LocalStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// JSON-file-backed string key/value store.
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Open the store at `path`, reading existing entries once.
    ///
    /// A missing file starts the store empty. A corrupt file is logged and
    /// treated as empty rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Corrupt local store, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Self { path, entries })
    }

    /// Open the store and wrap it for sharing between engines.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be read.
    pub fn open_shared(path: impl Into<PathBuf>) -> Result<SharedStore, StoreError> {
        Ok(Arc::new(Mutex::new(Self::open(path)?)))
    }

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a JSON-encoded value. Returns `None` for a missing key or a
    /// value that no longer parses (logged, not surfaced).
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.entries.get(key)?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Unreadable local store entry");
                None
            }
        }
    }

    /// Write a JSON-encoded value and flush to disk.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                self.entries.insert(key.to_owned(), raw);
                self.flush();
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode local store entry");
            }
        }
    }

    /// Read a raw string value.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Write a raw string value and flush to disk.
    pub fn set_raw(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush();
    }

    /// Remove a key (no error if absent) and flush to disk.
    pub fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.flush();
        }
    }

    /// Remove every key and flush to disk.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.flush();
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn flush(&self) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to create store directory");
            return;
        }

        let encoded = match serde_json::to_string_pretty(&self.entries) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode local store");
                return;
            }
        };

        if let Err(e) = fs::write(&self.path, encoded) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist local store");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_set_get_roundtrip() {
        let (_dir, mut store) = temp_store();

        store.set(keys::CART_COUNT, &3_u32);
        assert_eq!(store.get::<u32>(keys::CART_COUNT), Some(3));
    }

    #[test]
    fn test_raw_values_are_not_json() {
        let (_dir, mut store) = temp_store();

        store.set_raw(keys::AUTH_TOKEN, "abc.def.ghi");
        assert_eq!(store.get_raw(keys::AUTH_TOKEN), Some("abc.def.ghi"));
    }

    #[test]
    fn test_reload_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let mut store = LocalStore::open(&path).unwrap();
            store.set(keys::CART_COUNT, &7_u32);
            store.set_raw(keys::USERNAME, "meera");
        }

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get::<u32>(keys::CART_COUNT), Some(7));
        assert_eq!(reopened.get_raw(keys::USERNAME), Some("meera"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, mut store) = temp_store();

        store.set_raw(keys::USERNAME, "meera");
        store.remove(keys::USERNAME);
        store.remove(keys::USERNAME);
        assert!(!store.contains(keys::USERNAME));
    }

    #[test]
    fn test_clear_removes_everything() {
        let (_dir, mut store) = temp_store();

        store.set(keys::CART_COUNT, &3_u32);
        store.set_raw(keys::AUTH_TOKEN, "abc");
        store.clear();

        assert!(!store.contains(keys::CART_COUNT));
        assert!(!store.contains(keys::AUTH_TOKEN));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json at all {{{").unwrap();

        let store = LocalStore::open(&path).unwrap();
        assert!(!store.contains(keys::CART));
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("nope.json")).unwrap();
        assert!(!store.contains(keys::CART));
    }

    #[test]
    fn test_unparseable_entry_reads_as_none() {
        let (_dir, mut store) = temp_store();

        store.set_raw(keys::CART_COUNT, "definitely-not-a-number");
        assert_eq!(store.get::<u32>(keys::CART_COUNT), None);
    }
}
