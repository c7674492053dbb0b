//! Ridge regression (L2-regularized least squares).
//!
//! Minimizes `||y - Xb - c||^2 + alpha * ||b||^2`. The intercept `c` is not
//! penalized: features and target are centered, the normal equations
//! `(X'X + alpha I) b = X'y` are solved directly, and `c` is recovered from
//! the means.

use crate::error::{ModelError, Result};
use crate::regressor::{Regressor, validate_predict, validate_training};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Pivots smaller than this are treated as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Ridge regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    alpha: f64,
    fit_intercept: bool,
    coefficients: Option<Array1<f64>>,
    intercept: Option<f64>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0, true)
    }
}

impl RidgeRegression {
    /// Create an unfitted model.
    pub const fn new(alpha: f64, fit_intercept: bool) -> Self {
        Self {
            alpha,
            fit_intercept,
            coefficients: None,
            intercept: None,
        }
    }

    /// Regularization strength.
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fitted coefficients.
    pub const fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    /// Fitted intercept.
    pub const fn intercept(&self) -> Option<f64> {
        self.intercept
    }
}

impl Regressor for RidgeRegression {
    fn name(&self) -> &'static str {
        "ridge"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.coefficients = None;
        self.intercept = None;

        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "alpha must be >= 0, got {}",
                self.alpha
            )));
        }
        validate_training(x, y, 1)?;

        let (x_centered, y_centered, x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or(ModelError::InsufficientData { required: 1, actual: 0 })?;
            let y_mean = y.sum() / y.len() as f64;
            (x - &x_mean, y - y_mean, x_mean, y_mean)
        } else {
            (x.clone(), y.clone(), Array1::zeros(x.ncols()), 0.0)
        };

        let mut gram = x_centered.t().dot(&x_centered);
        for i in 0..gram.nrows() {
            gram[[i, i]] += self.alpha;
        }
        let rhs = x_centered.t().dot(&y_centered);

        let coefficients = solve(gram, rhs)?;
        let intercept = y_mean - x_mean.dot(&coefficients);

        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (coefficients, intercept) = match (&self.coefficients, self.intercept) {
            (Some(c), Some(i)) => (c, i),
            _ => return Err(ModelError::NotFitted),
        };
        validate_predict(x, coefficients.len())?;
        Ok(x.dot(coefficients) + intercept)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some() && self.intercept.is_some()
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();

    for k in 0..n {
        let pivot_row = (k..n)
            .max_by(|&i, &j| a[[i, k]].abs().total_cmp(&a[[j, k]].abs()))
            .unwrap_or(k);
        if a[[pivot_row, k]].abs() < PIVOT_TOLERANCE {
            return Err(ModelError::Singular(format!("zero pivot in column {}", k)));
        }
        if pivot_row != k {
            for j in 0..n {
                a.swap([k, j], [pivot_row, j]);
            }
            b.swap(k, pivot_row);
        }

        for i in (k + 1)..n {
            let factor = a[[i, k]] / a[[k, k]];
            if factor == 0.0 {
                continue;
            }
            for j in k..n {
                a[[i, j]] -= factor * a[[k, j]];
            }
            b[i] -= factor * b[k];
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|j| a[[i, j]] * x[j]).sum();
        x[i] = (b[i] - tail) / a[[i, i]];
    }
    Ok(x)
}
