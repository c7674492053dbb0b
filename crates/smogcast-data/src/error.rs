//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during batch decoding, merging and snapshotting.
#[derive(Debug, Error)]
pub enum DataError {
    /// No batch could be retrieved, so there is nothing to train on
    #[error("No data found in storage: none of [{}] could be retrieved", attempted.join(", "))]
    NoData {
        /// Batch names that were attempted
        attempted: Vec<String>,
    },

    /// A required column is absent from a batch header
    #[error("Batch is missing required column: {0}")]
    MissingColumn(String),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by [`ObjectStore`](crate::store::ObjectStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Object store refused or failed the request
    #[error("Storage unavailable for {name}: {reason}")]
    Unavailable {
        /// Object name
        name: String,
        /// Reason reported by the backend
        reason: String,
    },

    /// Network error (includes request timeouts)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error means the object is simply absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
