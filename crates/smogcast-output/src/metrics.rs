//! Regression metrics for held-out evaluation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors computing metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Truth and prediction lengths differ
    #[error("Length mismatch: {truth} true values, {predicted} predictions")]
    LengthMismatch {
        /// Number of true values
        truth: usize,
        /// Number of predictions
        predicted: usize,
    },

    /// Nothing to evaluate
    #[error("Cannot compute metrics on an empty split")]
    Empty,
}

/// R², MSE and MAE of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Coefficient of determination
    pub r2: f64,
    /// Mean squared error
    pub mse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Number of evaluated rows
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Evaluate predictions against true values.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self, MetricsError> {
        if y_true.len() != y_pred.len() {
            return Err(MetricsError::LengthMismatch {
                truth: y_true.len(),
                predicted: y_pred.len(),
            });
        }
        if y_true.is_empty() {
            return Err(MetricsError::Empty);
        }

        Ok(Self {
            r2: r2_score(y_true, y_pred),
            mse: mean_squared_error(y_true, y_pred),
            mae: mean_absolute_error(y_true, y_pred),
            n_samples: y_true.len(),
        })
    }

    /// R² expressed as a percentage. This is the "accuracy" figure reported
    /// for the regressor; it is not a classification accuracy.
    pub fn accuracy_pct(&self) -> f64 {
        self.r2 * 100.0
    }

    /// Root mean squared error.
    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

/// Mean of squared residuals.
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n
}

/// Mean of absolute residuals.
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// For a constant target the score is 1.0 when every prediction is exact and
/// 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        let m = RegressionMetrics::compute(&y, &y).unwrap();
        assert_relative_eq!(m.r2, 1.0);
        assert_relative_eq!(m.mse, 0.0);
        assert_relative_eq!(m.mae, 0.0);
        assert_relative_eq!(m.accuracy_pct(), 100.0);
    }

    #[test]
    fn test_known_values() {
        let y = [3.0, -0.5, 2.0, 7.0];
        let p = [2.5, 0.0, 2.0, 8.0];
        let m = RegressionMetrics::compute(&y, &p).unwrap();
        assert_relative_eq!(m.mse, 0.375);
        assert_relative_eq!(m.mae, 0.5);
        assert_relative_eq!(m.r2, 0.948_608_137_044_967_9, epsilon = 1e-12);
        assert_eq!(m.n_samples, 4);
    }

    #[test]
    fn test_mean_prediction_scores_zero() {
        let y = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 2.0];
        assert_relative_eq!(r2_score(&y, &p), 0.0);
    }

    #[test]
    fn test_r2_can_be_negative_but_not_above_one() {
        let y = [1.0, 2.0, 3.0];
        let p = [3.0, 2.0, 1.0];
        let r2 = r2_score(&y, &p);
        assert!(r2 < 0.0);
        assert!(r2 <= 1.0);
    }

    #[rstest]
    #[case(&[5.0, 5.0], &[5.0, 5.0], 1.0)]
    #[case(&[5.0, 5.0], &[5.0, 6.0], 0.0)]
    fn test_constant_target(#[case] y: &[f64], #[case] p: &[f64], #[case] expected: f64) {
        assert_relative_eq!(r2_score(y, p), expected);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            RegressionMetrics::compute(&[1.0], &[1.0, 2.0]),
            Err(MetricsError::LengthMismatch { truth: 1, predicted: 2 })
        ));
        assert!(matches!(RegressionMetrics::compute(&[], &[]), Err(MetricsError::Empty)));
    }
}
