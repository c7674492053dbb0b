//! Error types for the training pipeline.

use smogcast_data::{DataError, StoreError};
use smogcast_features::FeatureError;
use smogcast_model::ModelError;
use smogcast_output::{MetricsError, ReportError};
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that stop a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Batch decoding, merging or snapshot error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Storage error outside the recoverable fetch and upload paths
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Feature engineering or preprocessing error
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Ensemble error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Evaluation error
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// Report assembly error
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Artifact (de)serialization error
    #[error("Artifact serialization error: {0}")]
    Artifact(#[from] serde_json::Error),

    /// Artifact written by an incompatible version
    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedFormat {
        /// Version found in the artifact
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Artifact parts disagree with each other
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// Too few usable rows to split and train
    #[error("Insufficient training data: {required} rows required, {actual} available")]
    InsufficientData {
        /// Minimum rows needed
        required: usize,
        /// Rows available after feature engineering
        actual: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the run failed because no batch could be retrieved.
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::Data(DataError::NoData { .. }))
    }
}
