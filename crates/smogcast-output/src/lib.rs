#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/smogcast/smogcast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod metrics;
pub mod report;

pub use export::{ExportError, ExportFormat, Exporter, PredictionRecord};
pub use metrics::{MetricsError, RegressionMetrics};
pub use report::{
    ArtifactSummary, DropSummary, MergeSummary, ReportBuilder, ReportError, SplitSummary,
    TrainingReport,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
