//! Regression trees stored as a flat node arena.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// One tree node. Children are indices into the owning tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Internal node: rows with `x[feature] <= threshold` go left
    Split {
        /// Feature column
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left child index
        left: usize,
        /// Right child index
        right: usize,
    },

    /// Terminal node
    Leaf {
        /// Output value, already scaled by the learning rate
        value: f64,
    },
}

/// A binary regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// A tree with a single leaf.
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    /// Replace leaf `node` with a split, returning the new `(left, right)`
    /// child indices. Returns `None` if `node` is not a leaf.
    pub fn split_leaf(
        &mut self,
        node: usize,
        feature: usize,
        threshold: f64,
        left_value: f64,
        right_value: f64,
    ) -> Option<(usize, usize)> {
        if !matches!(self.nodes.get(node), Some(Node::Leaf { .. })) {
            return None;
        }
        let left = self.nodes.len();
        let right = left + 1;
        self.nodes.push(Node::Leaf { value: left_value });
        self.nodes.push(Node::Leaf { value: right_value });
        self.nodes[node] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        Some((left, right))
    }

    /// Predict a single row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// All nodes, root first.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        max_depth
    }

    /// Check that every child index is in range and points forward.
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, n)| match n {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    left,
                    right,
                    threshold,
                    ..
                } => {
                    *left > i
                        && *right > i
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                        && !threshold.is_nan()
                }
            })
    }

    /// Largest feature index referenced by a split.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }
}
