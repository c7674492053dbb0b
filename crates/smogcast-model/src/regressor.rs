//! The regressor seam shared by every model.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2};

/// A model mapping feature rows to one real value each.
pub trait Regressor {
    /// Short model name for logs.
    fn name(&self) -> &'static str;

    /// Fit from scratch, discarding any previous fit.
    ///
    /// # Errors
    ///
    /// Fails on mismatched shapes, non-finite input or too few rows.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`.
    ///
    /// # Errors
    ///
    /// Fails if the model is not fitted or `x` has the wrong width.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Whether [`fit`](Self::fit) has succeeded.
    fn is_fitted(&self) -> bool;
}

/// Check a training pair: matching row counts, at least `min_rows` rows,
/// every value finite.
pub(crate) fn validate_training(x: &Array2<f64>, y: &Array1<f64>, min_rows: usize) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ModelError::DimensionMismatch {
            expected: x.nrows(),
            actual: y.len(),
        });
    }
    if x.nrows() < min_rows {
        return Err(ModelError::InsufficientData {
            required: min_rows,
            actual: x.nrows(),
        });
    }
    if x.ncols() == 0 {
        return Err(ModelError::InvalidParameter("feature matrix has no columns".to_string()));
    }
    if !x.iter().all(|v| v.is_finite()) {
        return Err(ModelError::NonFiniteInput("features"));
    }
    if !y.iter().all(|v| v.is_finite()) {
        return Err(ModelError::NonFiniteInput("labels"));
    }
    Ok(())
}

/// Check a prediction input against the fitted width.
pub(crate) fn validate_predict(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(ModelError::DimensionMismatch {
            expected: n_features,
            actual: x.ncols(),
        });
    }
    if !x.iter().all(|v| v.is_finite()) {
        return Err(ModelError::NonFiniteInput("features"));
    }
    Ok(())
}
