//! The fitted prediction pipeline and its artifact encoding.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use smogcast_data::Observation;
use smogcast_features::{FeatureEngineer, FeatureRow, FittedPreprocessor, Preprocessor};
use smogcast_model::{Regressor, StackingConfig, StackingRegressor};
use smogcast_output::PredictionRecord;
use std::path::Path;

/// Artifact layout version written by this build.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Frozen preprocessing composed with a trained ensemble.
///
/// Holds no reference to the training data. Serialized as one JSON document
/// `{format_version, trained_at, feature_names, preprocessor, regressor}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    format_version: u32,
    trained_at: DateTime<Utc>,
    feature_names: Vec<String>,
    preprocessor: FittedPreprocessor,
    regressor: StackingRegressor,
}

impl FittedPipeline {
    /// Fit preprocessing and the ensemble on labeled rows.
    pub fn fit(rows: &[FeatureRow], labels: &[f64], config: &StackingConfig) -> Result<Self> {
        let preprocessor = Preprocessor::new().fit(rows)?;
        let x = preprocessor.transform(rows);
        let y = Array1::from(labels.to_vec());

        let mut regressor = StackingRegressor::new(config.clone());
        regressor.fit(&x, &y)?;

        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: Utc::now(),
            feature_names: preprocessor.feature_names(),
            preprocessor,
            regressor,
        })
    }

    /// Predict PM2.5 for engineered rows.
    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Array1<f64>> {
        if rows.is_empty() {
            return Ok(Array1::zeros(0));
        }
        let x = self.preprocessor.transform(rows);
        Ok(self.regressor.predict(&x)?)
    }

    /// Engineer and predict raw observations.
    ///
    /// Rows the feature engineer drops get no record; the rest keep their
    /// input order.
    pub fn predict_observations(
        &self,
        observations: &[Observation],
    ) -> Result<Vec<PredictionRecord>> {
        let features = FeatureEngineer::new().engineer_unlabeled(observations)?;
        if features.dropped.dropped() > 0 {
            tracing::info!(
                "Skipping {} of {} observations ({} missing a reading, {} with a bad timestamp)",
                features.dropped.dropped(),
                features.dropped.input_rows,
                features.dropped.missing_values,
                features.dropped.unparsable_timestamp
            );
        }

        let predictions = self.predict(&features.rows)?;
        Ok(features
            .source_rows
            .iter()
            .zip(predictions.iter())
            .map(|(&i, &predicted)| {
                let obs = &observations[i];
                PredictionRecord::new(obs.timestamp.clone(), obs.city.clone(), predicted, obs.pm25)
            })
            .collect())
    }

    /// Layout version.
    pub const fn format_version(&self) -> u32 {
        self.format_version
    }

    /// When the pipeline was fitted.
    pub const fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Encoded column names, in model input order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Fitted preprocessing transform.
    pub const fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    /// Trained ensemble.
    pub const fn regressor(&self) -> &StackingRegressor {
        &self.regressor
    }

    /// Serialize to the artifact encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and check an artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let pipeline: Self = serde_json::from_slice(bytes)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Read an artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PipelineError::UnsupportedFormat {
                found: self.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        self.preprocessor.validate()?;
        if self.feature_names.len() != self.preprocessor.n_features() {
            return Err(PipelineError::CorruptArtifact(format!(
                "{} feature names for {} encoded columns",
                self.feature_names.len(),
                self.preprocessor.n_features()
            )));
        }
        if !self.regressor.is_fitted() {
            return Err(PipelineError::CorruptArtifact("ensemble is not fitted".to_string()));
        }
        let expected = self.regressor.n_features().unwrap_or_default();
        if expected != self.preprocessor.n_features() {
            return Err(PipelineError::CorruptArtifact(format!(
                "ensemble expects {} columns, preprocessor produces {}",
                expected,
                self.preprocessor.n_features()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smogcast_model::{BoostingConfig, ExactGreedyConfig, HistogramConfig};

    fn rows(n: usize) -> (Vec<FeatureRow>, Vec<f64>) {
        let cities = ["Accra", "Bern", "Quito"];
        (0..n)
            .map(|i| {
                let temperature = (i % 17) as f64;
                let humidity = 40.0 + (i % 11) as f64;
                let co = 100.0 + (i % 7) as f64 * 10.0;
                let row = FeatureRow {
                    city: cities[i % 3].to_string(),
                    temperature,
                    humidity,
                    co,
                    hour: (i % 24) as u32,
                    day: 1 + (i % 28) as u32,
                    month: 1 + (i % 12) as u32,
                    temp_humidity_interaction: temperature * humidity,
                    co_temp_interaction: co * temperature,
                };
                (row, 5.0 * (i % 3) as f64 + co / 10.0)
            })
            .unzip()
    }

    fn small_config() -> StackingConfig {
        let boosting = BoostingConfig {
            n_estimators: 15,
            learning_rate: 0.3,
            ..Default::default()
        };
        StackingConfig {
            cv_folds: 3,
            exact: ExactGreedyConfig {
                boosting: boosting.clone(),
                ..Default::default()
            },
            histogram: HistogramConfig {
                boosting,
                min_data_in_leaf: 3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_fit_predict_and_round_trip() {
        let (x, y) = rows(45);
        let pipeline = FittedPipeline::fit(&x, &y, &small_config()).unwrap();
        assert_eq!(pipeline.format_version(), ARTIFACT_FORMAT_VERSION);
        assert_eq!(pipeline.feature_names().len(), 3 + 8);
        assert_eq!(pipeline.feature_names()[0], "City_Accra");

        let predictions = pipeline.predict(&x).unwrap();
        assert_eq!(predictions.len(), 45);

        let restored = FittedPipeline::from_bytes(&pipeline.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), predictions);
        assert!(pipeline.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_other_format_version() {
        let (x, y) = rows(30);
        let mut pipeline = FittedPipeline::fit(&x, &y, &small_config()).unwrap();
        pipeline.format_version = ARTIFACT_FORMAT_VERSION + 1;
        let bytes = pipeline.to_bytes().unwrap();
        assert!(matches!(
            FittedPipeline::from_bytes(&bytes),
            Err(PipelineError::UnsupportedFormat { found: 2, expected: 1 })
        ));
    }

    #[test]
    fn test_rejects_mismatched_feature_names() {
        let (x, y) = rows(30);
        let mut pipeline = FittedPipeline::fit(&x, &y, &small_config()).unwrap();
        pipeline.feature_names.pop();
        let bytes = pipeline.to_bytes().unwrap();
        assert!(matches!(
            FittedPipeline::from_bytes(&bytes),
            Err(PipelineError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(FittedPipeline::from_bytes(b"not json"), Err(PipelineError::Artifact(_))));
    }
}
