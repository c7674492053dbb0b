//! Artifact publication.
//!
//! The local copy is written first and must succeed. The upload is best
//! effort: a failure is logged and recorded, and the run still succeeds.

use crate::error::Result;
use crate::pipeline::FittedPipeline;
use smogcast_data::{ObjectStore, StoreError, write_atomic};
use smogcast_output::ArtifactSummary;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The artifact could not be uploaded. The local copy remains.
#[derive(Debug, Error)]
#[error("Failed to upload artifact '{name}': {error}")]
pub struct ArtifactPublishError {
    /// Object name
    pub name: String,
    /// Underlying store error
    pub error: StoreError,
}

/// What publication did.
#[derive(Debug)]
pub struct PublishOutcome {
    /// Local artifact path
    pub local_path: PathBuf,
    /// Object name in the store
    pub remote_name: String,
    /// Serialized size in bytes
    pub size_bytes: usize,
    /// Upload failure, if any
    pub error: Option<ArtifactPublishError>,
}

impl PublishOutcome {
    /// Whether the upload succeeded.
    pub const fn published(&self) -> bool {
        self.error.is_none()
    }

    /// Report section for this outcome.
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            local_path: self.local_path.display().to_string(),
            remote_name: self.remote_name.clone(),
            size_bytes: self.size_bytes,
            published: self.published(),
            publish_error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Writes the artifact locally and forwards it to a store.
#[derive(Debug)]
pub struct ArtifactPublisher<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    artifact_name: String,
    local_path: PathBuf,
}

impl<'a, S: ObjectStore + ?Sized> ArtifactPublisher<'a, S> {
    /// Create a publisher.
    pub fn new(
        store: &'a S,
        artifact_name: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            artifact_name: artifact_name.into(),
            local_path: local_path.into(),
        }
    }

    /// Local artifact path.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Serialize, replace the local file, then upload.
    ///
    /// # Errors
    ///
    /// Fails only if serialization or the local write fails.
    pub fn publish(&self, pipeline: &FittedPipeline) -> Result<PublishOutcome> {
        let bytes = pipeline.to_bytes()?;
        write_atomic(&self.local_path, &bytes)?;
        tracing::info!(
            "Wrote artifact to {} ({} bytes)",
            self.local_path.display(),
            bytes.len()
        );

        let error = match self.store.store(&self.artifact_name, &bytes) {
            Ok(()) => {
                tracing::info!(
                    "Published artifact as '{}' to {}",
                    self.artifact_name,
                    self.store.describe()
                );
                None
            }
            Err(error) => {
                let error = ArtifactPublishError {
                    name: self.artifact_name.clone(),
                    error,
                };
                tracing::warn!("{}; local copy kept at {}", error, self.local_path.display());
                Some(error)
            }
        };

        Ok(PublishOutcome {
            local_path: self.local_path.clone(),
            remote_name: self.artifact_name.clone(),
            size_bytes: bytes.len(),
            error,
        })
    }
}
