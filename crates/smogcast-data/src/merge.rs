//! Batch fetching and merging.
//!
//! Batches are fetched independently; a batch that cannot be fetched or
//! decoded is logged and skipped. The surviving batches are concatenated in
//! supply order and deduplicated on `(City, Timestamp)`, keeping the last
//! occurrence. The later batch therefore wins a key collision regardless of
//! which reading is more recent.

use crate::batch::{Batch, BatchSource, encode_batch};
use crate::error::{DataError, Result, StoreError};
use crate::observation::Observation;
use crate::store::ObjectStore;
use std::collections::HashMap;
use thiserror::Error;

/// One named batch could not be used. Recovered by merging the others.
#[derive(Debug, Error)]
pub enum BatchFetchError {
    /// The store could not return the object
    #[error("Could not fetch {source_kind} batch '{name}': {error}")]
    Fetch {
        /// Batch source kind
        source_kind: BatchSource,
        /// Object name
        name: String,
        /// Underlying store error
        error: StoreError,
    },

    /// The object was fetched but is not a usable batch
    #[error("Could not decode {source_kind} batch '{name}': {error}")]
    Decode {
        /// Batch source kind
        source_kind: BatchSource,
        /// Object name
        name: String,
        /// Underlying decode error
        error: DataError,
    },
}

impl BatchFetchError {
    /// Name of the batch that failed.
    pub fn name(&self) -> &str {
        match self {
            Self::Fetch { name, .. } | Self::Decode { name, .. } => name,
        }
    }
}

/// Outcome of fetching every requested batch.
#[derive(Debug, Default)]
pub struct FetchedBatches {
    /// Batches that were fetched and decoded, in request order
    pub batches: Vec<Batch>,
    /// Batches that were skipped
    pub failures: Vec<BatchFetchError>,
}

impl FetchedBatches {
    /// Names of every batch that was requested.
    pub fn attempted(&self) -> Vec<String> {
        self.batches
            .iter()
            .map(|b| b.name.clone())
            .chain(self.failures.iter().map(|f| f.name().to_string()))
            .collect()
    }
}

/// Fetch each `(source, name)` from `store`, in order.
///
/// Never fails as a whole: individual failures are logged at `warn` and
/// returned in [`FetchedBatches::failures`].
pub fn fetch_batches<S>(store: &S, sources: &[(BatchSource, String)]) -> FetchedBatches
where
    S: ObjectStore + ?Sized,
{
    let mut fetched = FetchedBatches::default();

    for (source, name) in sources {
        let outcome = store
            .fetch(name)
            .map_err(|error| BatchFetchError::Fetch {
                source_kind: *source,
                name: name.clone(),
                error,
            })
            .and_then(|bytes| {
                Batch::from_csv(*source, name.clone(), &bytes).map_err(|error| {
                    BatchFetchError::Decode {
                        source_kind: *source,
                        name: name.clone(),
                        error,
                    }
                })
            });

        match outcome {
            Ok(batch) => {
                tracing::info!("Fetched {} batch '{}' ({} rows)", source, name, batch.len());
                fetched.batches.push(batch);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                fetched.failures.push(e);
            }
        }
    }

    fetched
}

/// Combined, deduplicated observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedDataset {
    rows: Vec<Observation>,
    input_rows: usize,
    sources: Vec<String>,
}

impl MergedDataset {
    /// Deduplicated observations.
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Consume the dataset, returning its observations.
    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    /// Number of rows after deduplication.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows across all input batches before deduplication.
    pub const fn input_rows(&self) -> usize {
        self.input_rows
    }

    /// Rows removed as duplicates.
    pub const fn duplicates_removed(&self) -> usize {
        self.input_rows - self.rows.len()
    }

    /// Names of the batches merged, in supply order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Encode the dataset as a batch-schema CSV snapshot.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        encode_batch(&self.rows)
    }
}

/// Concatenate `batches` in order and drop duplicate `(City, Timestamp)` keys,
/// keeping the last occurrence.
///
/// A surviving row keeps the position of its last occurrence in the
/// concatenated sequence.
///
/// # Errors
///
/// Returns [`DataError::NoData`] if `batches` is empty.
pub fn merge_batches(batches: Vec<Batch>) -> Result<MergedDataset> {
    if batches.is_empty() {
        return Err(DataError::NoData {
            attempted: Vec::new(),
        });
    }

    let sources: Vec<String> = batches.iter().map(|b| b.name.clone()).collect();
    let combined: Vec<Observation> = batches.into_iter().flat_map(|b| b.rows).collect();
    let input_rows = combined.len();

    let mut last_index: HashMap<(&str, &str), usize> = HashMap::with_capacity(input_rows);
    for (i, obs) in combined.iter().enumerate() {
        last_index.insert(obs.key(), i);
    }

    let keep: Vec<bool> = combined
        .iter()
        .enumerate()
        .map(|(i, obs)| last_index.get(&obs.key()) == Some(&i))
        .collect();
    drop(last_index);

    let rows: Vec<Observation> = combined
        .into_iter()
        .zip(keep)
        .filter_map(|(obs, keep)| keep.then_some(obs))
        .collect();

    tracing::info!(
        "Merged {} batches: {} input rows, {} after deduplication",
        sources.len(),
        input_rows,
        rows.len()
    );

    Ok(MergedDataset {
        rows,
        input_rows,
        sources,
    })
}
