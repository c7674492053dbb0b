#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/smogcast/smogcast/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod boost;
pub mod error;
pub mod linear;
pub mod regressor;
pub mod stacking;
pub mod tree;

pub use boost::{
    BoostingConfig, ExactGreedyBooster, ExactGreedyConfig, HistogramBooster, HistogramConfig,
};
pub use error::{ModelError, Result};
pub use linear::RidgeRegression;
pub use regressor::Regressor;
pub use stacking::{BaseLearner, StackingConfig, StackingRegressor, kfold_indices};
pub use tree::{Node, RegressionTree};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
