//! Error types for feature engineering and preprocessing.

use thiserror::Error;

/// Result type for feature operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors that can occur while deriving or encoding features.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Preprocessor was fit on zero rows
    #[error("Cannot fit preprocessor on an empty feature set")]
    EmptyFit,

    /// A value that survived filtering was unexpectedly null
    #[error("Unexpected null in column {column} at row {row}")]
    UnexpectedNull {
        /// Column name
        column: &'static str,
        /// Row position in the filtered frame
        row: usize,
    },

    /// Fitted state does not match the feature schema
    #[error("Invalid preprocessor state: {0}")]
    InvalidState(String),
}
