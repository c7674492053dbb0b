#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/smogcast/smogcast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod publisher;
pub mod trainer;

// Re-export main types from sub-crates
pub use smogcast_data as data;
pub use smogcast_features as features;
pub use smogcast_model as model;
pub use smogcast_output as output;

pub use config::{PipelineConfig, StoreConfig, TrainConfig, mask_sas_token};
pub use error::{PipelineError, Result};
pub use job::{TrainingRun, fetch_pipeline, predict_file, push_batches, run_training_job};
pub use pipeline::{ARTIFACT_FORMAT_VERSION, FittedPipeline};
pub use publisher::{ArtifactPublishError, ArtifactPublisher, PublishOutcome};
pub use trainer::{TrainTestSplit, Trainer, TrainingOutcome, train_test_split};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
