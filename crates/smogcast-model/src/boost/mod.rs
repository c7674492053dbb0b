//! Gradient-boosted regression trees.
//!
//! Both boosters share one boosting loop over squared-error loss: start from
//! the mean label, then each round fits a tree to the current gradients on a
//! row subsample and a column subsample. They differ only in how a tree is
//! grown:
//!
//! - [`ExactGreedyBooster`]: depth-wise growth, exact split enumeration over
//!   presorted columns, L2 leaf regularization.
//! - [`HistogramBooster`]: leaf-wise (best-first) growth over quantile bins,
//!   capped by leaf count and minimum rows per leaf.

pub mod exact;
pub mod histogram;

pub use exact::{ExactGreedyBooster, ExactGreedyConfig};
pub use histogram::{HistogramBooster, HistogramConfig};

use crate::error::{ModelError, Result};
use crate::tree::RegressionTree;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Splits must improve the objective by more than this.
pub(crate) const MIN_SPLIT_GAIN: f64 = 1e-6;

/// Settings shared by both boosters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Boosting rounds (default: 300)
    pub n_estimators: usize,
    /// Shrinkage applied to each tree (default: 0.05)
    pub learning_rate: f64,
    /// Maximum tree depth (default: 6)
    pub max_depth: usize,
    /// Fraction of rows sampled per round (default: 0.8)
    pub subsample: f64,
    /// Fraction of columns sampled per tree (default: 0.8)
    pub colsample_bytree: f64,
    /// Random seed (default: 42)
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            learning_rate: 0.05,
            max_depth: 6,
            subsample: 0.8,
            colsample_bytree: 0.8,
            seed: 42,
        }
    }
}

impl BoostingConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter("n_estimators must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 {
            return Err(ModelError::InvalidParameter("max_depth must be at least 1".to_string()));
        }
        for (name, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A fitted additive tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl BoostedTrees {
    /// Initial prediction before any tree.
    pub const fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Width of the training matrix.
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Trees in boosting order.
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Sum of the base score and every tree's output, per row.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|t| t.predict_row(row))
                        .sum::<f64>()
            })
            .collect()
    }

    /// Check that every tree only references columns of the fitted width.
    pub(crate) fn is_consistent(&self) -> bool {
        self.base_score.is_finite()
            && self.trees.iter().all(|t| {
                t.is_well_formed() && t.max_feature().is_none_or(|f| f < self.n_features)
            })
    }
}

/// Grows one tree against the current gradients.
pub(crate) trait TreeGrower {
    /// Grow a tree using only `rows` and splitting only on `cols`.
    fn grow(&self, grad: &[f64], hess: &[f64], rows: &[usize], cols: &[usize]) -> RegressionTree;
}

/// Run the squared-error boosting loop.
pub(crate) fn boost<G: TreeGrower>(
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &BoostingConfig,
    grower: &G,
) -> BoostedTrees {
    let n = x.nrows();
    let p = x.ncols();
    let base_score = y.sum() / n as f64;
    let mut pred = vec![base_score; n];
    let hess = vec![1.0; n];
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut trees = Vec::with_capacity(config.n_estimators);

    for _ in 0..config.n_estimators {
        let grad: Vec<f64> = pred.iter().zip(y.iter()).map(|(p, t)| p - t).collect();
        let rows = sample_rows(&mut rng, n, config.subsample);
        let cols = sample_columns(&mut rng, p, config.colsample_bytree);

        let tree = grower.grow(&grad, &hess, &rows, &cols);
        for (i, row) in x.rows().into_iter().enumerate() {
            pred[i] += tree.predict_row(row);
        }
        trees.push(tree);
    }

    BoostedTrees {
        base_score,
        n_features: p,
        trees,
    }
}

/// Sorted sample of `round(n * fraction)` row indices, at least one.
pub(crate) fn sample_rows(rng: &mut ChaCha8Rng, n: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let amount = ((n as f64 * fraction).round() as usize).clamp(1, n);
    let mut rows = index::sample(rng, n, amount).into_vec();
    rows.sort_unstable();
    rows
}

/// Sorted sample of `floor(p * fraction)` column indices, at least one.
pub(crate) fn sample_columns(rng: &mut ChaCha8Rng, p: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..p).collect();
    }
    let amount = ((p as f64 * fraction).floor() as usize).clamp(1, p);
    let mut cols = index::sample(rng, p, amount).into_vec();
    cols.sort_unstable();
    cols
}

/// Newton step for a leaf, scaled by the learning rate.
pub(crate) fn leaf_value(g: f64, h: f64, lambda: f64, learning_rate: f64) -> f64 {
    let denom = h + lambda;
    if denom > 0.0 { -g / denom * learning_rate } else { 0.0 }
}

/// Structure score `G^2 / (H + lambda)` of a node.
pub(crate) fn structure_score(g: f64, h: f64, lambda: f64) -> f64 {
    let denom = h + lambda;
    if denom > 0.0 { g * g / denom } else { 0.0 }
}

/// Midpoint threshold separating `lo` from `hi`, falling back to `lo` when
/// the midpoint rounds up to `hi`.
pub(crate) fn split_threshold(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi { mid } else { lo }
}
