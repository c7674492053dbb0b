//! Training run reports.

use crate::metrics::RegressionMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required section was never set.
    #[error("Report is missing its {0} section")]
    Incomplete(&'static str),
}

/// What the merge stage saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Batches merged, in supply order
    pub batches_merged: Vec<String>,
    /// Batches that could not be fetched or decoded
    pub batches_failed: Vec<String>,
    /// Rows across merged batches
    pub input_rows: usize,
    /// Rows after deduplication
    pub merged_rows: usize,
}

impl MergeSummary {
    /// Rows removed as duplicates.
    pub const fn duplicates_removed(&self) -> usize {
        self.input_rows.saturating_sub(self.merged_rows)
    }
}

/// Rows removed during feature engineering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropSummary {
    /// Rows missing a required reading
    pub missing_values: usize,
    /// Rows with an unparsable timestamp
    pub unparsable_timestamp: usize,
}

/// Train/test partition sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    /// Training rows
    pub train_rows: usize,
    /// Held-out rows
    pub test_rows: usize,
    /// Columns of the encoded feature matrix
    pub n_features: usize,
}

/// Where the artifact went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    /// Local artifact path
    pub local_path: String,
    /// Object name in the store
    pub remote_name: String,
    /// Serialized size in bytes
    pub size_bytes: usize,
    /// Whether the upload succeeded
    pub published: bool,
    /// Upload failure, if any
    pub publish_error: Option<String>,
}

/// Summary of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Merge stage
    pub merge: MergeSummary,
    /// Feature engineering drops
    pub drops: DropSummary,
    /// Split sizes
    pub split: SplitSummary,
    /// Held-out metrics
    pub metrics: RegressionMetrics,
    /// Artifact publication
    pub artifact: ArtifactSummary,
}

impl TrainingReport {
    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as a fixed-width text table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nPM2.5 Model Training Report\n");
        output.push_str(&format!(
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&"=".repeat(60));
        output.push('\n');

        let merge = &self.merge;
        push_row(&mut output, "Batches merged", merge.batches_merged.join(", "));
        if !merge.batches_failed.is_empty() {
            push_row(&mut output, "Batches unavailable", merge.batches_failed.join(", "));
        }
        push_row(&mut output, "Input rows", merge.input_rows);
        push_row(&mut output, "Duplicates removed", merge.duplicates_removed());
        push_row(&mut output, "Dropped (missing values)", self.drops.missing_values);
        push_row(&mut output, "Dropped (bad timestamp)", self.drops.unparsable_timestamp);
        push_row(
            &mut output,
            "Train / test rows",
            format!("{} / {}", self.split.train_rows, self.split.test_rows),
        );
        push_row(&mut output, "Encoded features", self.split.n_features);

        output.push_str(&"-".repeat(60));
        output.push('\n');

        let metrics = &self.metrics;
        push_row(&mut output, "R²", format!("{:.4}", metrics.r2));
        push_row(
            &mut output,
            "Accuracy (R² x 100)",
            format!("{:.2}%", metrics.accuracy_pct()),
        );
        push_row(&mut output, "MSE", format!("{:.4}", metrics.mse));
        push_row(&mut output, "RMSE", format!("{:.4}", metrics.rmse()));
        push_row(&mut output, "MAE", format!("{:.4}", metrics.mae));

        output.push_str(&"-".repeat(60));
        output.push('\n');

        push_row(&mut output, "Artifact", &self.artifact.local_path);
        let status = if self.artifact.published {
            format!("published as {}", self.artifact.remote_name)
        } else {
            "upload failed, local copy only".to_string()
        };
        push_row(&mut output, "Upload", status);
        if let Some(err) = &self.artifact.publish_error {
            output.push_str(&format!("  {}\n", err));
        }

        output
    }
}

fn push_row(output: &mut String, label: &str, value: impl std::fmt::Display) {
    output.push_str(&format!("{:<32} {:>26}\n", label, value));
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    merge: Option<MergeSummary>,
    drops: DropSummary,
    split: Option<SplitSummary>,
    metrics: Option<RegressionMetrics>,
    artifact: Option<ArtifactSummary>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the merge summary.
    pub fn merge(mut self, merge: MergeSummary) -> Self {
        self.merge = Some(merge);
        self
    }

    /// Set the drop counts.
    pub const fn drops(mut self, drops: DropSummary) -> Self {
        self.drops = drops;
        self
    }

    /// Set the split sizes.
    pub const fn split(mut self, split: SplitSummary) -> Self {
        self.split = Some(split);
        self
    }

    /// Set the held-out metrics.
    pub const fn metrics(mut self, metrics: RegressionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the artifact summary.
    pub fn artifact(mut self, artifact: ArtifactSummary) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<TrainingReport, ReportError> {
        Ok(TrainingReport {
            generated_at: Utc::now(),
            merge: self.merge.ok_or(ReportError::Incomplete("merge"))?,
            drops: self.drops,
            split: self.split.ok_or(ReportError::Incomplete("split"))?,
            metrics: self.metrics.ok_or(ReportError::Incomplete("metrics"))?,
            artifact: self.artifact.ok_or(ReportError::Incomplete("artifact"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_builder() -> ReportBuilder {
        ReportBuilder::new()
            .merge(MergeSummary {
                batches_merged: vec!["historical.csv".into(), "live.csv".into()],
                batches_failed: vec![],
                input_rows: 110,
                merged_rows: 109,
            })
            .drops(DropSummary {
                missing_values: 3,
                unparsable_timestamp: 1,
            })
            .split(SplitSummary {
                train_rows: 84,
                test_rows: 21,
                n_features: 12,
            })
            .metrics(RegressionMetrics {
                r2: 0.8731,
                mse: 42.5,
                mae: 4.1,
                n_samples: 21,
            })
    }

    #[test]
    fn test_report_builder() {
        let report = sample_builder()
            .artifact(ArtifactSummary {
                local_path: "models/stacked_env_model.json".into(),
                remote_name: "models/high_accuracy_env_model.json".into(),
                size_bytes: 1024,
                published: true,
                publish_error: None,
            })
            .build()
            .unwrap();

        assert_eq!(report.merge.duplicates_removed(), 1);
        let table = report.to_ascii_table();
        assert!(table.contains("PM2.5 Model Training Report"));
        assert!(table.contains("87.31%"));
        // sqrt(42.5)
        assert!(table.contains("RMSE"));
        assert!(table.contains("6.5192"));
        assert!(table.contains("84 / 21"));
        assert!(table.contains("published as models/high_accuracy_env_model.json"));

        let json = report.to_json().unwrap();
        let back: TrainingReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_failed_upload_is_shown() {
        let report = sample_builder()
            .artifact(ArtifactSummary {
                local_path: "m.json".into(),
                remote_name: "r.json".into(),
                size_bytes: 10,
                published: false,
                publish_error: Some("Storage unavailable".into()),
            })
            .build()
            .unwrap();
        let table = report.to_ascii_table();
        assert!(table.contains("upload failed"));
        assert!(table.contains("Storage unavailable"));
    }

    #[test]
    fn test_missing_section() {
        let err = ReportBuilder::new().build().unwrap_err();
        assert!(matches!(err, ReportError::Incomplete("merge")));
        assert!(matches!(sample_builder().build(), Err(ReportError::Incomplete("artifact"))));
    }
}
