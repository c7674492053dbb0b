//! Exact-greedy booster.
//!
//! Trees grow one level at a time. For every active node of a level, each
//! sampled feature is scanned once in presorted order and every boundary
//! between distinct values is scored with the second-order gain
//!
//! `0.5 * (GL^2/(HL+lambda) + GR^2/(HR+lambda) - G^2/(H+lambda))`.

use super::{
    BoostedTrees, BoostingConfig, MIN_SPLIT_GAIN, TreeGrower, boost, leaf_value, split_threshold,
    structure_score,
};
use crate::error::{ModelError, Result};
use crate::regressor::{Regressor, validate_predict, validate_training};
use crate::tree::RegressionTree;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

const INACTIVE: usize = usize::MAX;

/// Configuration for [`ExactGreedyBooster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactGreedyConfig {
    /// Shared boosting settings
    #[serde(flatten)]
    pub boosting: BoostingConfig,
    /// L2 regularization on leaf weights (default: 1.0)
    pub lambda: f64,
    /// Minimum hessian sum in each child (default: 1.0)
    pub min_child_weight: f64,
}

impl Default for ExactGreedyConfig {
    fn default() -> Self {
        Self {
            boosting: BoostingConfig::default(),
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

impl ExactGreedyConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        self.boosting.validate()?;
        if !(self.lambda >= 0.0 && self.lambda.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "lambda must be >= 0, got {}",
                self.lambda
            )));
        }
        if !(self.min_child_weight >= 0.0 && self.min_child_weight.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "min_child_weight must be >= 0, got {}",
                self.min_child_weight
            )));
        }
        Ok(())
    }
}

/// Depth-wise gradient boosting with exact split search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactGreedyBooster {
    config: ExactGreedyConfig,
    model: Option<BoostedTrees>,
}

impl Default for ExactGreedyBooster {
    fn default() -> Self {
        Self::new(ExactGreedyConfig::default())
    }
}

impl ExactGreedyBooster {
    /// Create an unfitted booster.
    pub const fn new(config: ExactGreedyConfig) -> Self {
        Self { config, model: None }
    }

    /// Configuration.
    pub const fn config(&self) -> &ExactGreedyConfig {
        &self.config
    }

    /// Fitted trees, if any.
    pub const fn model(&self) -> Option<&BoostedTrees> {
        self.model.as_ref()
    }
}

impl Regressor for ExactGreedyBooster {
    fn name(&self) -> &'static str {
        "exact_greedy"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.model = None;
        self.config.validate()?;
        validate_training(x, y, 1)?;

        let grower = ExactGrower::new(x, &self.config);
        let model = boost(x, y, &self.config.boosting, &grower);
        tracing::debug!(
            "Fitted exact-greedy booster: {} trees on {} x {}",
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

/// Node of the level currently being split.
#[derive(Debug, Clone, Copy)]
struct LevelNode {
    tree_node: usize,
    g: f64,
    h: f64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    gain: f64,
    feature: usize,
    threshold: f64,
    gl: f64,
    hl: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    gl: f64,
    hl: f64,
    last: Option<f64>,
}

struct ExactGrower<'a> {
    x: &'a Array2<f64>,
    sorted: Vec<Vec<usize>>,
    config: &'a ExactGreedyConfig,
}

impl<'a> ExactGrower<'a> {
    fn new(x: &'a Array2<f64>, config: &'a ExactGreedyConfig) -> Self {
        let sorted = (0..x.ncols())
            .map(|f| {
                let mut order: Vec<usize> = (0..x.nrows()).collect();
                order.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));
                order
            })
            .collect();
        Self { x, sorted, config }
    }

    fn find_splits(
        &self,
        level: &[LevelNode],
        position: &[usize],
        grad: &[f64],
        hess: &[f64],
        cols: &[usize],
    ) -> Vec<Option<Candidate>> {
        let lambda = self.config.lambda;
        let min_child = self.config.min_child_weight;
        let mut best: Vec<Option<Candidate>> = vec![None; level.len()];

        for &f in cols {
            let mut scan = vec![ScanState::default(); level.len()];
            for &r in &self.sorted[f] {
                let k = position[r];
                if k == INACTIVE {
                    continue;
                }
                let v = self.x[[r, f]];
                let state = &mut scan[k];

                if let Some(last) = state.last
                    && v > last
                {
                    let node = level[k];
                    let (gl, hl) = (state.gl, state.hl);
                    let (gr, hr) = (node.g - gl, node.h - hl);
                    if hl >= min_child && hr >= min_child {
                        let gain = 0.5
                            * (structure_score(gl, hl, lambda) + structure_score(gr, hr, lambda)
                                - structure_score(node.g, node.h, lambda));
                        let improves = best[k].is_none_or(|b| gain > b.gain);
                        if gain > MIN_SPLIT_GAIN && improves {
                            best[k] = Some(Candidate {
                                gain,
                                feature: f,
                                threshold: split_threshold(last, v),
                                gl,
                                hl,
                            });
                        }
                    }
                }

                state.gl += grad[r];
                state.hl += hess[r];
                state.last = Some(v);
            }
        }

        best
    }
}

impl TreeGrower for ExactGrower<'_> {
    fn grow(&self, grad: &[f64], hess: &[f64], rows: &[usize], cols: &[usize]) -> RegressionTree {
        let lambda = self.config.lambda;
        let lr = self.config.boosting.learning_rate;

        let mut position = vec![INACTIVE; self.x.nrows()];
        let (mut g, mut h) = (0.0, 0.0);
        for &r in rows {
            position[r] = 0;
            g += grad[r];
            h += hess[r];
        }

        let mut tree = RegressionTree::leaf(leaf_value(g, h, lambda, lr));
        let mut level = vec![LevelNode { tree_node: 0, g, h }];

        for _ in 0..self.config.boosting.max_depth {
            let candidates = self.find_splits(&level, &position, grad, hess, cols);
            let mut next = Vec::new();
            // per level node: (feature, threshold, left position, right position)
            let mut routes: Vec<Option<(usize, f64, usize, usize)>> = vec![None; level.len()];

            for (k, candidate) in candidates.iter().enumerate() {
                let Some(c) = candidate else { continue };
                let node = level[k];
                let (gr, hr) = (node.g - c.gl, node.h - c.hl);
                let Some((left, right)) = tree.split_leaf(
                    node.tree_node,
                    c.feature,
                    c.threshold,
                    leaf_value(c.gl, c.hl, lambda, lr),
                    leaf_value(gr, hr, lambda, lr),
                ) else {
                    continue;
                };
                routes[k] = Some((c.feature, c.threshold, next.len(), next.len() + 1));
                next.push(LevelNode {
                    tree_node: left,
                    g: c.gl,
                    h: c.hl,
                });
                next.push(LevelNode {
                    tree_node: right,
                    g: gr,
                    h: hr,
                });
            }

            if next.is_empty() {
                break;
            }

            for &r in rows {
                let k = position[r];
                if k == INACTIVE {
                    continue;
                }
                position[r] = match routes[k] {
                    Some((f, t, left, right)) => {
                        if self.x[[r, f]] <= t {
                            left
                        } else {
                            right
                        }
                    }
                    None => INACTIVE,
                };
            }
            level = next;
        }

        tree
    }
}
