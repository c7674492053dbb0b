//! Train/test split, fitting and held-out evaluation.
//!
//! The split is a fixed-seed shuffle with no temporal ordering, so readings
//! from the same hour can land on both sides. Scores are comparable between
//! runs but are not a forecast of out-of-period accuracy.

use crate::config::TrainConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::FittedPipeline;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use smogcast_features::{FeatureRow, FeatureSet};
use smogcast_output::{RegressionMetrics, SplitSummary};

/// Row indices of each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    /// Training rows, in shuffled order
    pub train: Vec<usize>,
    /// Held-out rows, in shuffled order
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out the first `ceil(test_fraction * n)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let train = indices.split_off(n_test);
    TrainTestSplit { train, test: indices }
}

/// Result of one fit-and-evaluate pass.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The fitted pipeline
    pub pipeline: FittedPipeline,
    /// Held-out metrics
    pub metrics: RegressionMetrics,
    /// Partition sizes
    pub split: SplitSummary,
}

/// Fits a [`FittedPipeline`] and scores it on a held-out split.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    /// Create a trainer.
    pub const fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    pub const fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Split, fit preprocessing and ensemble on the train rows, evaluate on
    /// the test rows.
    pub fn run(&self, features: &FeatureSet) -> Result<TrainingOutcome> {
        self.config.validate()?;

        let n = features.len();
        let split = train_test_split(n, self.config.test_fraction, self.config.seed);
        let required = self.config.model.cv_folds.max(1);
        if split.train.len() < required || split.test.is_empty() {
            return Err(PipelineError::InsufficientData {
                required: required + 1,
                actual: n,
            });
        }

        let (train_rows, train_labels) = gather(features, &split.train);
        let (test_rows, test_labels) = gather(features, &split.test);

        tracing::info!(
            "Training on {} rows, holding out {} (seed {})",
            train_rows.len(),
            test_rows.len(),
            self.config.seed
        );
        let pipeline = FittedPipeline::fit(&train_rows, &train_labels, &self.config.model)?;

        let predictions = pipeline.predict(&test_rows)?;
        let metrics = RegressionMetrics::compute(&test_labels, &predictions.to_vec())?;
        tracing::info!(
            "Held-out R² {:.4} (accuracy {:.2}%), MSE {:.4}, MAE {:.4}",
            metrics.r2,
            metrics.accuracy_pct(),
            metrics.mse,
            metrics.mae
        );

        Ok(TrainingOutcome {
            split: SplitSummary {
                train_rows: train_rows.len(),
                test_rows: test_rows.len(),
                n_features: pipeline.feature_names().len(),
            },
            pipeline,
            metrics,
        })
    }
}

fn gather(features: &FeatureSet, indices: &[usize]) -> (Vec<FeatureRow>, Vec<f64>) {
    indices
        .iter()
        .map(|&i| (features.rows[i].clone(), features.labels[i]))
        .unzip()
}
