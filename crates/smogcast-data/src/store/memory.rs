//! In-memory object store.

use super::ObjectStore;
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Object store backed by a `HashMap`, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    read_only: bool,
}

impl MemoryStore {
    /// Create an empty, writable store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose writes always fail.
    pub fn read_only() -> Self {
        Self {
            objects: Mutex::default(),
            read_only: true,
        }
    }

    /// Insert an object directly, bypassing the read-only flag.
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(name.into(), bytes.into());
    }

    /// Get a copy of an object, if present.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().get(name).cloned()
    }

    /// Whether an object exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still a consistent map: every write is a single insert.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectStore for MemoryStore {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Unavailable {
                name: name.to_string(),
                reason: "store is read-only".to_string(),
            });
        }
        self.insert(name, bytes);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory ({} objects)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let store = MemoryStore::new();
        store.store("a.csv", b"hello").unwrap();
        assert_eq!(store.fetch("a.csv").unwrap(), b"hello");
    }

    #[test]
    fn test_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.fetch("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_store_replaces_whole_object() {
        let store = MemoryStore::new();
        store.store("m", b"first version").unwrap();
        store.store("m", b"v2").unwrap();
        assert_eq!(store.fetch("m").unwrap(), b"v2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let store = MemoryStore::read_only();
        store.insert("seed", b"x".to_vec());
        assert!(store.store("other", b"y").is_err());
        assert!(store.fetch("seed").is_ok());
        assert!(!store.contains("other"));
    }
}
