//! Histogram booster.
//!
//! Each feature is discretized once per fit into at most `max_bins` bins.
//! Trees grow best-first: the leaf whose best split has the largest gain is
//! split next, until the tree has `max_leaves` leaves or no leaf can be
//! split without leaving fewer than `min_data_in_leaf` rows on a side.

use super::{
    BoostedTrees, BoostingConfig, MIN_SPLIT_GAIN, TreeGrower, boost, leaf_value, structure_score,
};
use crate::error::{ModelError, Result};
use crate::regressor::{Regressor, validate_predict, validate_training};
use crate::tree::RegressionTree;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Configuration for [`HistogramBooster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// Shared boosting settings
    #[serde(flatten)]
    pub boosting: BoostingConfig,
    /// L2 regularization on leaf weights (default: 0.0)
    pub lambda: f64,
    /// Maximum bins per feature, at most 256 (default: 255)
    pub max_bins: usize,
    /// Maximum leaves per tree (default: 31)
    pub max_leaves: usize,
    /// Minimum rows in each leaf (default: 20)
    pub min_data_in_leaf: usize,
    /// Minimum hessian sum in each leaf (default: 1e-3)
    pub min_sum_hessian: f64,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            boosting: BoostingConfig::default(),
            lambda: 0.0,
            max_bins: 255,
            max_leaves: 31,
            min_data_in_leaf: 20,
            min_sum_hessian: 1e-3,
        }
    }
}

impl HistogramConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        self.boosting.validate()?;
        if !(self.lambda >= 0.0 && self.lambda.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "lambda must be >= 0, got {}",
                self.lambda
            )));
        }
        if !(2..=256).contains(&self.max_bins) {
            return Err(ModelError::InvalidParameter(format!(
                "max_bins must be in 2..=256, got {}",
                self.max_bins
            )));
        }
        if self.max_leaves < 2 {
            return Err(ModelError::InvalidParameter("max_leaves must be at least 2".to_string()));
        }
        if self.min_data_in_leaf == 0 {
            return Err(ModelError::InvalidParameter(
                "min_data_in_leaf must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Leaf-wise gradient boosting over binned features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBooster {
    config: HistogramConfig,
    model: Option<BoostedTrees>,
}

impl Default for HistogramBooster {
    fn default() -> Self {
        Self::new(HistogramConfig::default())
    }
}

impl HistogramBooster {
    /// Create an unfitted booster.
    pub const fn new(config: HistogramConfig) -> Self {
        Self { config, model: None }
    }

    /// Configuration.
    pub const fn config(&self) -> &HistogramConfig {
        &self.config
    }

    /// Fitted trees, if any.
    pub const fn model(&self) -> Option<&BoostedTrees> {
        self.model.as_ref()
    }
}

impl Regressor for HistogramBooster {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.model = None;
        self.config.validate()?;
        validate_training(x, y, 1)?;

        let grower = HistogramGrower::new(x, &self.config);
        let model = boost(x, y, &self.config.boosting, &grower);
        tracing::debug!(
            "Fitted histogram booster: {} trees on {} x {}",
            model.trees().len(),
            x.nrows(),
            x.ncols()
        );
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or(ModelError::NotFitted)?;
        validate_predict(x, model.n_features())?;
        Ok(model.predict(x))
    }

    fn is_fitted(&self) -> bool {
        self.model.as_ref().is_some_and(BoostedTrees::is_consistent)
    }
}

/// Bin boundaries for one feature. A value `v` falls in the first bin `b`
/// with `v <= upper_bounds[b]`; the last bound is `+inf`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BinMapper {
    upper_bounds: Vec<f64>,
}

impl BinMapper {
    /// Build bins from a feature column.
    pub(crate) fn fit(column: ArrayView1<'_, f64>, max_bins: usize) -> Self {
        let mut values: Vec<f64> = column.to_vec();
        values.sort_by(f64::total_cmp);

        let mut distinct = values.clone();
        distinct.dedup();

        let mut upper_bounds: Vec<f64> = if distinct.len() <= max_bins {
            distinct
                .windows(2)
                .map(|w| super::split_threshold(w[0], w[1]))
                .collect()
        } else {
            let n = values.len();
            let mut cuts: Vec<f64> = (1..max_bins).map(|b| values[b * n / max_bins - 1]).collect();
            cuts.dedup();
            cuts
        };
        upper_bounds.push(f64::INFINITY);

        Self { upper_bounds }
    }

    /// Number of bins.
    pub(crate) fn n_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    /// Bin index for `value`.
    pub(crate) fn bin(&self, value: f64) -> usize {
        self.upper_bounds.partition_point(|&u| u < value)
    }

    /// Threshold reproducing "bin <= b" on raw values.
    pub(crate) fn threshold(&self, bin: usize) -> f64 {
        self.upper_bounds[bin]
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    gain: f64,
    feature: usize,
    bin: usize,
    gl: f64,
    hl: f64,
}

#[derive(Debug)]
struct LeafState {
    tree_node: usize,
    rows: Vec<usize>,
    g: f64,
    h: f64,
    depth: usize,
    best: Option<Candidate>,
}

struct HistogramGrower<'a> {
    mappers: Vec<BinMapper>,
    /// Column-major bin indices
    bins: Vec<Vec<u8>>,
    config: &'a HistogramConfig,
}

impl<'a> HistogramGrower<'a> {
    fn new(x: &Array2<f64>, config: &'a HistogramConfig) -> Self {
        let mappers: Vec<BinMapper> = x
            .columns()
            .into_iter()
            .map(|c| BinMapper::fit(c, config.max_bins))
            .collect();
        let bins = x
            .columns()
            .into_iter()
            .zip(&mappers)
            .map(|(c, m)| c.iter().map(|&v| u8::try_from(m.bin(v)).unwrap_or(u8::MAX)).collect())
            .collect();
        Self {
            mappers,
            bins,
            config,
        }
    }

    fn best_split(
        &self,
        leaf: &LeafState,
        grad: &[f64],
        hess: &[f64],
        cols: &[usize],
    ) -> Option<Candidate> {
        let min_data = self.config.min_data_in_leaf;
        if leaf.depth >= self.config.boosting.max_depth || leaf.rows.len() < 2 * min_data {
            return None;
        }
        let lambda = self.config.lambda;
        let min_hess = self.config.min_sum_hessian;
        let parent = structure_score(leaf.g, leaf.h, lambda);
        let mut best: Option<Candidate> = None;

        for &f in cols {
            let n_bins = self.mappers[f].n_bins();
            let mut hist_g = vec![0.0; n_bins];
            let mut hist_h = vec![0.0; n_bins];
            let mut hist_c = vec![0usize; n_bins];
            let column = &self.bins[f];
            for &r in &leaf.rows {
                let b = usize::from(column[r]);
                hist_g[b] += grad[r];
                hist_h[b] += hess[r];
                hist_c[b] += 1;
            }

            let (mut gl, mut hl, mut cl) = (0.0, 0.0, 0usize);
            for b in 0..n_bins.saturating_sub(1) {
                gl += hist_g[b];
                hl += hist_h[b];
                cl += hist_c[b];
                let cr = leaf.rows.len() - cl;
                if cl < min_data {
                    continue;
                }
                if cr < min_data {
                    break;
                }
                let (gr, hr) = (leaf.g - gl, leaf.h - hl);
                if hl < min_hess || hr < min_hess {
                    continue;
                }
                let gain =
                    structure_score(gl, hl, lambda) + structure_score(gr, hr, lambda) - parent;
                if gain > MIN_SPLIT_GAIN && best.is_none_or(|c| gain > c.gain) {
                    best = Some(Candidate {
                        gain,
                        feature: f,
                        bin: b,
                        gl,
                        hl,
                    });
                }
            }
        }

        best
    }
}

impl TreeGrower for HistogramGrower<'_> {
    fn grow(&self, grad: &[f64], hess: &[f64], rows: &[usize], cols: &[usize]) -> RegressionTree {
        let lambda = self.config.lambda;
        let lr = self.config.boosting.learning_rate;

        let g: f64 = rows.iter().map(|&r| grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| hess[r]).sum();
        let mut tree = RegressionTree::leaf(leaf_value(g, h, lambda, lr));

        let mut root = LeafState {
            tree_node: 0,
            rows: rows.to_vec(),
            g,
            h,
            depth: 0,
            best: None,
        };
        root.best = self.best_split(&root, grad, hess, cols);
        let mut leaves = vec![root];

        while leaves.len() < self.config.max_leaves {
            let chosen = leaves
                .iter()
                .enumerate()
                .filter_map(|(i, l)| l.best.map(|c| (i, c)))
                .fold(None, |acc: Option<(usize, Candidate)>, (i, c)| match acc {
                    Some((_, a)) if a.gain >= c.gain => acc,
                    _ => Some((i, c)),
                });
            let Some((idx, c)) = chosen else { break };

            let leaf = &leaves[idx];
            let (gr, hr) = (leaf.g - c.gl, leaf.h - c.hl);
            let threshold = self.mappers[c.feature].threshold(c.bin);
            let Some((left_node, right_node)) = tree.split_leaf(
                leaf.tree_node,
                c.feature,
                threshold,
                leaf_value(c.gl, c.hl, lambda, lr),
                leaf_value(gr, hr, lambda, lr),
            ) else {
                break;
            };

            let column = &self.bins[c.feature];
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                leaf.rows.iter().copied().partition(|&r| usize::from(column[r]) <= c.bin);
            let depth = leaf.depth + 1;

            let mut left = LeafState {
                tree_node: left_node,
                rows: left_rows,
                g: c.gl,
                h: c.hl,
                depth,
                best: None,
            };
            let mut right = LeafState {
                tree_node: right_node,
                rows: right_rows,
                g: gr,
                h: hr,
                depth,
                best: None,
            };
            left.best = self.best_split(&left, grad, hess, cols);
            right.best = self.best_split(&right, grad, hess, cols);

            leaves[idx] = left;
            leaves.push(right);
        }

        tree
    }
}
