//! End-to-end jobs: training, batch upload and batch inference.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::FittedPipeline;
use crate::publisher::{ArtifactPublisher, PublishOutcome};
use crate::trainer::{Trainer, TrainingOutcome};
use smogcast_data::{
    DataError, ObjectStore, decode_batch, fetch_batches, merge_batches, write_atomic,
};
use smogcast_features::FeatureEngineer;
use smogcast_output::{DropSummary, MergeSummary, PredictionRecord, ReportBuilder, TrainingReport};
use std::path::{Path, PathBuf};

/// Everything a successful training run produced.
#[derive(Debug)]
pub struct TrainingRun {
    /// Fit and evaluation results
    pub outcome: TrainingOutcome,
    /// Publication results
    pub publish: PublishOutcome,
    /// Run summary
    pub report: TrainingReport,
}

/// Fetch, merge, snapshot, engineer, train, evaluate and publish.
///
/// # Errors
///
/// Fails when no batch can be retrieved (nothing is trained or stored), or
/// when a training stage or a local write fails. Individual batch failures
/// and upload failures are logged and do not fail the run.
pub fn run_training_job<S: ObjectStore + ?Sized>(
    store: &S,
    config: &PipelineConfig,
) -> Result<TrainingRun> {
    config.validate()?;
    tracing::info!("Fetching batches from {}", store.describe());

    let fetched = fetch_batches(store, &config.batch_sources());
    if fetched.batches.is_empty() {
        return Err(DataError::NoData {
            attempted: fetched.attempted(),
        }
        .into());
    }
    let batches_failed: Vec<String> = fetched
        .failures
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let merged = merge_batches(fetched.batches)?;
    write_atomic(&config.snapshot_path, &merged.to_csv_bytes()?)?;
    tracing::info!(
        "Wrote merged snapshot of {} rows to {}",
        merged.len(),
        config.snapshot_path.display()
    );
    let merge_summary = MergeSummary {
        batches_merged: merged.sources().to_vec(),
        batches_failed,
        input_rows: merged.input_rows(),
        merged_rows: merged.len(),
    };

    let features = FeatureEngineer::new().engineer(merged.rows())?;
    let outcome = Trainer::new(config.train.clone()).run(&features)?;

    let publisher = ArtifactPublisher::new(
        store,
        config.artifact_name.clone(),
        config.local_artifact_path.clone(),
    );
    let publish = publisher.publish(&outcome.pipeline)?;

    let report = ReportBuilder::new()
        .merge(merge_summary)
        .drops(DropSummary {
            missing_values: features.dropped.missing_values,
            unparsable_timestamp: features.dropped.unparsable_timestamp,
        })
        .split(outcome.split)
        .metrics(outcome.metrics)
        .artifact(publish.summary())
        .build()?;

    Ok(TrainingRun {
        outcome,
        publish,
        report,
    })
}

/// Upload local batch files under their file names.
///
/// Every file is checked to decode as a batch before anything is uploaded.
/// Returns the object names written.
pub fn push_batches<S: ObjectStore + ?Sized>(store: &S, paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::Config(format!("not a file path: {}", path.display())))?
            .to_string();
        let bytes = std::fs::read(path)?;
        let rows = decode_batch(&bytes)?;
        tracing::debug!("{}: {} rows", path.display(), rows.len());
        uploads.push((name, bytes));
    }

    let mut names = Vec::with_capacity(uploads.len());
    for (name, bytes) in uploads {
        store.store(&name, &bytes)?;
        tracing::info!("Uploaded {} ({} bytes) to {}", name, bytes.len(), store.describe());
        names.push(name);
    }
    Ok(names)
}

/// Load the published artifact from a store.
pub fn fetch_pipeline<S: ObjectStore + ?Sized>(
    store: &S,
    artifact_name: &str,
) -> Result<FittedPipeline> {
    let bytes = store.fetch(artifact_name)?;
    let pipeline = FittedPipeline::from_bytes(&bytes)?;
    tracing::info!(
        "Loaded artifact '{}' trained at {}",
        artifact_name,
        pipeline.trained_at()
    );
    Ok(pipeline)
}

/// Predict every usable row of an observation CSV file.
pub fn predict_file(pipeline: &FittedPipeline, input: &Path) -> Result<Vec<PredictionRecord>> {
    let observations = decode_batch(&std::fs::read(input)?)?;
    let records = pipeline.predict_observations(&observations)?;
    tracing::info!(
        "Predicted {} of {} rows from {}",
        records.len(),
        observations.len(),
        input.display()
    );
    Ok(records)
}
