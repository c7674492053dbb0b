//! Two-level stacked ensemble.
//!
//! Level 0 holds the two boosters. Their out-of-fold predictions from a
//! contiguous K-fold split become the two input columns of a ridge
//! meta-learner (level 1). After the meta-learner is fitted the base learners
//! are refit on all rows, so prediction uses base models that saw the full
//! training set.

use crate::boost::{ExactGreedyBooster, ExactGreedyConfig, HistogramBooster, HistogramConfig};
use crate::error::{ModelError, Result};
use crate::linear::RidgeRegression;
use crate::regressor::{Regressor, validate_predict, validate_training};
use derive_more::Display;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for [`StackingRegressor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingConfig {
    /// Cross-validation folds for out-of-fold predictions (default: 5)
    pub cv_folds: usize,
    /// Ridge penalty of the meta-learner (default: 1.0)
    pub meta_alpha: f64,
    /// Exact-greedy base learner
    pub exact: ExactGreedyConfig,
    /// Histogram base learner
    pub histogram: HistogramConfig,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            meta_alpha: 1.0,
            exact: ExactGreedyConfig::default(),
            histogram: HistogramConfig::default(),
        }
    }
}

impl StackingConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(ModelError::InvalidParameter(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(self.meta_alpha >= 0.0 && self.meta_alpha.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "meta_alpha must be >= 0, got {}",
                self.meta_alpha
            )));
        }
        self.exact.validate()?;
        self.histogram.validate()
    }

    fn base_learners(&self) -> [BaseLearner; 2] {
        [
            BaseLearner::ExactGreedy(ExactGreedyBooster::new(self.exact.clone())),
            BaseLearner::Histogram(HistogramBooster::new(self.histogram.clone())),
        ]
    }
}

/// A level-0 model.
#[derive(Debug, Display, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseLearner {
    /// Depth-wise exact-greedy booster
    #[display("exact_greedy")]
    ExactGreedy(ExactGreedyBooster),

    /// Leaf-wise histogram booster
    #[display("histogram")]
    Histogram(HistogramBooster),
}

impl Regressor for BaseLearner {
    fn name(&self) -> &'static str {
        match self {
            Self::ExactGreedy(m) => m.name(),
            Self::Histogram(m) => m.name(),
        }
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Self::ExactGreedy(m) => m.fit(x, y),
            Self::Histogram(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::ExactGreedy(m) => m.predict(x),
            Self::Histogram(m) => m.predict(x),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            Self::ExactGreedy(m) => m.is_fitted(),
            Self::Histogram(m) => m.is_fitted(),
        }
    }
}

/// Contiguous K-fold split: `(train, test)` index pairs. The first
/// `n % k` folds hold one extra row.
pub fn kfold_indices(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    if k == 0 {
        return Vec::new();
    }
    let base = n / k;
    let extra = n % k;
    let mut start = 0;

    (0..k)
        .map(|fold| {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let test: Vec<usize> = (start..end).collect();
            let train: Vec<usize> = (0..start).chain(end..n).collect();
            start = end;
            (train, test)
        })
        .collect()
}

/// Stacked ensemble: boosted base learners feeding a ridge meta-learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingRegressor {
    config: StackingConfig,
    base: Vec<BaseLearner>,
    meta: RidgeRegression,
    n_features: Option<usize>,
}

impl Default for StackingRegressor {
    fn default() -> Self {
        Self::new(StackingConfig::default())
    }
}

impl StackingRegressor {
    /// Create an unfitted ensemble.
    pub fn new(config: StackingConfig) -> Self {
        let meta = RidgeRegression::new(config.meta_alpha, true);
        Self {
            config,
            base: Vec::new(),
            meta,
            n_features: None,
        }
    }

    /// Configuration.
    pub const fn config(&self) -> &StackingConfig {
        &self.config
    }

    /// Fitted base learners.
    pub fn base_learners(&self) -> &[BaseLearner] {
        &self.base
    }

    /// Meta-learner.
    pub const fn meta_learner(&self) -> &RidgeRegression {
        &self.meta
    }

    /// Width of the training matrix, once fitted.
    pub const fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Level-0 predictions, one column per base learner.
    pub fn base_predictions(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let n_features = self.n_features.ok_or(ModelError::NotFitted)?;
        validate_predict(x, n_features)?;

        let columns = self
            .base
            .par_iter()
            .map(|m| m.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut out = Array2::zeros((x.nrows(), columns.len()));
        for (j, column) in columns.iter().enumerate() {
            out.column_mut(j).assign(column);
        }
        Ok(out)
    }

    fn out_of_fold(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
        let folds = kfold_indices(x.nrows(), self.config.cv_folds);
        let n_learners = self.config.base_learners().len();

        let jobs: Vec<(usize, usize)> = (0..n_learners)
            .flat_map(|l| (0..folds.len()).map(move |f| (l, f)))
            .collect();

        let results = jobs
            .into_par_iter()
            .map(|(l, f)| {
                let (train, test) = &folds[f];
                let mut learner = self.config.base_learners()[l].clone();
                let x_train = x.select(Axis(0), train);
                let y_train = y.select(Axis(0), train);
                learner.fit(&x_train, &y_train)?;
                let pred = learner.predict(&x.select(Axis(0), test))?;
                tracing::debug!(
                    "Fold {}/{} of {}: trained on {} rows, predicted {}",
                    f + 1,
                    folds.len(),
                    learner,
                    train.len(),
                    test.len()
                );
                Ok((l, f, pred))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut oof = Array2::zeros((x.nrows(), n_learners));
        for (l, f, pred) in results {
            for (&row, value) in folds[f].1.iter().zip(pred.iter()) {
                oof[[row, l]] = *value;
            }
        }
        Ok(oof)
    }
}

impl Regressor for StackingRegressor {
    fn name(&self) -> &'static str {
        "stacking"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.base.clear();
        self.n_features = None;
        self.meta = RidgeRegression::new(self.config.meta_alpha, true);

        self.config.validate()?;
        validate_training(x, y, self.config.cv_folds)?;

        let oof = self.out_of_fold(x, y)?;
        self.meta.fit(&oof, y)?;

        let base = self
            .config
            .base_learners()
            .into_par_iter()
            .map(|mut learner| {
                learner.fit(x, y)?;
                Ok(learner)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Fitted stacked ensemble on {} rows x {} features ({} folds); meta weights {:?}",
            x.nrows(),
            x.ncols(),
            self.config.cv_folds,
            self.meta.coefficients().map(|c| c.to_vec()).unwrap_or_default()
        );

        self.base = base;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let level0 = self.base_predictions(x)?;
        self.meta.predict(&level0)
    }

    fn is_fitted(&self) -> bool {
        self.n_features.is_some()
            && !self.base.is_empty()
            && self.base.iter().all(Regressor::is_fitted)
            && self.meta.is_fitted()
            && self.meta.coefficients().is_some_and(|c| c.len() == self.base.len())
    }
}
