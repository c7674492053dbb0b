//! Export of model predictions.
//!
//! Predictions are written per observation, keyed by the same `Timestamp`
//! and `City` columns the input batches use, so an export can be joined
//! back onto the data it was produced from.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[display("csv")]
    Csv,

    /// Compact JSON format.
    #[display("json")]
    Json,

    /// Pretty-printed JSON format.
    #[display("pretty-json")]
    PrettyJson,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "prettyjson" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// One predicted PM2.5 value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    /// Observation timestamp, as it appeared in the input.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// Observation city.
    #[serde(rename = "City")]
    pub city: String,

    /// Model output.
    #[serde(rename = "Predicted_PM2.5")]
    pub predicted_pm25: f64,

    /// Measured value, when the input carried one.
    #[serde(rename = "PM2.5")]
    pub observed_pm25: Option<f64>,
}

impl PredictionRecord {
    /// Create a new prediction record.
    pub const fn new(
        timestamp: String,
        city: String,
        predicted_pm25: f64,
        observed_pm25: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            city,
            predicted_pm25,
            observed_pm25,
        }
    }

    /// Signed error against the observed value.
    pub fn residual(&self) -> Option<f64> {
        self.observed_pm25.map(|observed| self.predicted_pm25 - observed)
    }
}

/// Trait for types that can be exported.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for [PredictionRecord] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self {
                    wtr.serialize(record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<PredictionRecord> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        self.as_slice().export_to_string(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn records() -> Vec<PredictionRecord> {
        vec![
            PredictionRecord::new(
                "2024-03-01 10:00:00".into(),
                "Delhi".into(),
                151.25,
                Some(148.0),
            ),
            PredictionRecord::new("2024-03-01 10:00:00".into(), "Oslo".into(), 6.5, None),
        ]
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!("parquet".parse::<ExportFormat>(), Err(ExportError::InvalidFormat(_))));
    }

    #[test]
    fn test_csv_columns() {
        let csv = records().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "Timestamp,City,Predicted_PM2.5,PM2.5");
        assert_eq!(lines.next().unwrap(), "2024-03-01 10:00:00,Delhi,151.25,148.0");
        assert_eq!(lines.next().unwrap(), "2024-03-01 10:00:00,Oslo,6.5,");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let json = records().export_to_string(ExportFormat::Json).unwrap();
        let back: Vec<PredictionRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, records());
    }

    #[test]
    fn test_residual() {
        let recs = records();
        assert_eq!(recs[0].residual(), Some(3.25));
        assert_eq!(recs[1].residual(), None);
    }
}
