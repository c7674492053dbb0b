//! Object storage adapters.
//!
//! The pipeline only needs two operations from storage: fetch the bytes
//! stored under a name, and store bytes under a name. Everything else
//! (containers, credentials, retries) belongs to the adapter.

pub mod http;
pub mod local;
pub mod memory;

pub use http::{HttpStore, HttpStoreConfig};
pub use local::{LocalStore, write_atomic};
pub use memory::MemoryStore;

use crate::error::StoreError;

/// Named-blob storage contract.
pub trait ObjectStore {
    /// Fetch the bytes stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under `name`, or
    /// another variant if the backend could not be reached.
    fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Store `bytes` under `name`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects or fails the write.
    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Short human-readable description used in logs.
    fn describe(&self) -> String;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        (**self).fetch(name)
    }

    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).store(name, bytes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        (**self).fetch(name)
    }

    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).store(name, bytes)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
