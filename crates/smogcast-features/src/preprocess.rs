//! One-hot encoding and standardization.
//!
//! The fitted transform lays columns out as the city indicators (in sorted
//! vocabulary order) followed by the standardized numeric features in
//! [`NUMERIC_FEATURES`] order. Cities not seen during fit encode as all
//! zeros.

use crate::error::{FeatureError, Result};
use crate::schema::{CATEGORICAL_FEATURE, FeatureRow, NUMERIC_FEATURES};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Learns encoding parameters from training rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    /// Create a preprocessor.
    pub const fn new() -> Self {
        Self
    }

    /// Learn the city vocabulary and per-column mean and scale.
    ///
    /// Scale is the population standard deviation; a constant column gets a
    /// scale of 1.0.
    pub fn fit(&self, rows: &[FeatureRow]) -> Result<FittedPreprocessor> {
        if rows.is_empty() {
            return Err(FeatureError::EmptyFit);
        }

        let categories: Vec<String> = rows
            .iter()
            .map(|r| r.city.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let n = rows.len() as f64;
        let mut means = [0.0; NUMERIC_FEATURES.len()];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row.numeric()) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut variances = [0.0; NUMERIC_FEATURES.len()];
        for row in rows {
            for ((var, v), m) in variances.iter_mut().zip(row.numeric()).zip(means) {
                *var += (v - m).powi(2);
            }
        }

        let scales = variances
            .iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > 0.0 && std.is_finite() { std } else { 1.0 }
            })
            .collect();

        tracing::debug!(
            "Fitted preprocessor on {} rows: {} cities",
            rows.len(),
            categories.len()
        );

        Ok(FittedPreprocessor {
            categories,
            means: means.to_vec(),
            scales,
        })
    }
}

/// Frozen encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    categories: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl FittedPreprocessor {
    /// Rebuild from stored parameters, checking their shape.
    pub fn from_parts(categories: Vec<String>, means: Vec<f64>, scales: Vec<f64>) -> Result<Self> {
        let fitted = Self {
            categories,
            means,
            scales,
        };
        fitted.validate()?;
        Ok(fitted)
    }

    /// Check that the parameters match the feature schema.
    pub fn validate(&self) -> Result<()> {
        if self.means.len() != NUMERIC_FEATURES.len()
            || self.scales.len() != NUMERIC_FEATURES.len()
        {
            return Err(FeatureError::InvalidState(format!(
                "expected {} numeric columns, found {} means and {} scales",
                NUMERIC_FEATURES.len(),
                self.means.len(),
                self.scales.len()
            )));
        }
        if self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(FeatureError::InvalidState(
                "scales must be finite and positive".to_string(),
            ));
        }
        if self.categories.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FeatureError::InvalidState(
                "city vocabulary must be sorted and unique".to_string(),
            ));
        }
        Ok(())
    }

    /// Learned city vocabulary, sorted.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Per-column means.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Per-column scales.
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Width of the transformed matrix.
    pub fn n_features(&self) -> usize {
        self.categories.len() + NUMERIC_FEATURES.len()
    }

    /// Output column names.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", CATEGORICAL_FEATURE, c))
            .chain(NUMERIC_FEATURES.iter().map(|s| (*s).to_string()))
            .collect()
    }

    /// Encode rows into a `rows.len() x n_features()` matrix.
    pub fn transform(&self, rows: &[FeatureRow]) -> Array2<f64> {
        let n_cat = self.categories.len();
        let mut out = Array2::zeros((rows.len(), self.n_features()));

        for (i, row) in rows.iter().enumerate() {
            if let Ok(j) = self.categories.binary_search(&row.city) {
                out[[i, j]] = 1.0;
            }
            for (k, v) in row.numeric().into_iter().enumerate() {
                out[[i, n_cat + k]] = (v - self.means[k]) / self.scales[k];
            }
        }

        out
    }
}
