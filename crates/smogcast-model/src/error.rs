//! Error types for model fitting and prediction.

use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised by regressors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Input shapes do not agree
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Too few rows to fit
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData {
        /// Minimum number of rows
        required: usize,
        /// Rows supplied
        actual: usize,
    },

    /// NaN or infinite value in the input
    #[error("Non-finite value in {0}")]
    NonFiniteInput(&'static str),

    /// Predict called before fit
    #[error("Model has not been fitted")]
    NotFitted,

    /// Linear system could not be solved
    #[error("Singular system: {0}")]
    Singular(String),

    /// Invalid hyperparameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
