#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/smogcast/smogcast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod error;
pub mod merge;
pub mod observation;
pub mod store;

pub use batch::{Batch, BatchSource, decode_batch, encode_batch};
pub use error::{DataError, Result, StoreError};
pub use merge::{BatchFetchError, FetchedBatches, MergedDataset, fetch_batches, merge_batches};
pub use observation::{BATCH_COLUMNS, Observation};
pub use store::{HttpStore, HttpStoreConfig, LocalStore, MemoryStore, ObjectStore, write_atomic};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
