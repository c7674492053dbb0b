#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/smogcast/smogcast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod engineer;
pub mod error;
pub mod preprocess;
pub mod schema;
pub mod timestamp;

pub use engineer::{DropReport, FeatureEngineer, FeatureSet, UnlabeledSet};
pub use error::{FeatureError, Result};
pub use preprocess::{FittedPreprocessor, Preprocessor};
pub use schema::{CATEGORICAL_FEATURE, FeatureRow, NUMERIC_FEATURES, TARGET};
pub use timestamp::parse_timestamp;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
