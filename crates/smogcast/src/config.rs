//! Run configuration.
//!
//! Every field has a default, so a JSON config file only needs to name what
//! it changes. The binary layers command-line flags on top.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use smogcast_data::{BatchSource, HttpStore, HttpStoreConfig, LocalStore, ObjectStore};
use smogcast_model::StackingConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default name of the historical batch.
pub const DEFAULT_HISTORICAL_BATCH: &str = "historical_global_env_data.csv";

/// Default name of the live batch.
pub const DEFAULT_LIVE_BATCH: &str = "live_global_env_data.csv";

/// Default object name of the published artifact.
pub const DEFAULT_ARTIFACT_NAME: &str = "models/high_accuracy_env_model.json";

/// Where the pipeline reads batches from and publishes artifacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Blob container URL. Takes precedence over `local_dir` when set.
    pub container_url: Option<String>,
    /// Shared access signature appended to every request
    pub sas_token: Option<String>,
    /// Directory used as the store when no container is configured
    pub local_dir: PathBuf,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            container_url: None,
            sas_token: None,
            local_dir: PathBuf::from("storage"),
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Build the configured store.
    pub fn open(&self) -> Result<Box<dyn ObjectStore>> {
        match &self.container_url {
            Some(url) => {
                let mut http = HttpStoreConfig::new(url.clone())
                    .with_timeout(Duration::from_secs(self.timeout_secs));
                if let Some(token) = &self.sas_token {
                    http = http.with_sas_token(token.clone());
                }
                Ok(Box::new(HttpStore::new(http)?))
            }
            None => Ok(Box::new(LocalStore::new(self.local_dir.clone()))),
        }
    }
}

/// Split and model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Fraction of rows held out for evaluation (default: 0.2)
    pub test_fraction: f64,
    /// Shuffle seed for the split (default: 42)
    pub seed: u64,
    /// Ensemble settings
    pub model: StackingConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            model: StackingConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        self.model.validate()?;
        Ok(())
    }
}

/// Configuration of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Object name of the historical batch
    pub historical_batch: String,
    /// Object name of the live batch
    pub live_batch: String,
    /// Object name the artifact is published under
    pub artifact_name: String,
    /// Where the merged snapshot is written
    pub snapshot_path: PathBuf,
    /// Where the local artifact copy is written
    pub local_artifact_path: PathBuf,
    /// Storage backend
    pub store: StoreConfig,
    /// Split and model settings
    pub train: TrainConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            historical_batch: DEFAULT_HISTORICAL_BATCH.to_string(),
            live_batch: DEFAULT_LIVE_BATCH.to_string(),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            snapshot_path: PathBuf::from("data/full_env_data.csv"),
            local_artifact_path: PathBuf::from("models/stacked_env_model.json"),
            store: StoreConfig::default(),
            train: TrainConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check that the config describes a runnable job.
    pub fn validate(&self) -> Result<()> {
        if self.historical_batch.is_empty() && self.live_batch.is_empty() {
            return Err(PipelineError::Config("no batch names configured".to_string()));
        }
        if self.artifact_name.is_empty() {
            return Err(PipelineError::Config("artifact_name is empty".to_string()));
        }
        self.train.validate()
    }

    /// Batches to fetch, in merge order. Empty names are skipped.
    pub fn batch_sources(&self) -> Vec<(BatchSource, String)> {
        [
            (BatchSource::Historical, &self.historical_batch),
            (BatchSource::Live, &self.live_batch),
        ]
        .into_iter()
        .filter(|(_, name)| !name.is_empty())
        .map(|(source, name)| (source, name.clone()))
        .collect()
    }

    /// Log the effective configuration. The SAS token is masked.
    pub fn log_config(&self) {
        let store = self.store.container_url.as_ref().map_or_else(
            || format!("local directory {}", self.store.local_dir.display()),
            |url| url.clone(),
        );
        let sas = self
            .store
            .sas_token
            .as_deref()
            .map_or_else(|| "(none)".to_string(), mask_sas_token);

        tracing::info!("Configuration loaded:");
        tracing::info!("  store            : {}", store);
        tracing::info!("  sas token        : {}", sas);
        tracing::info!("  timeout          : {}s", self.store.timeout_secs);
        tracing::info!("  historical batch : {}", self.historical_batch);
        tracing::info!("  live batch       : {}", self.live_batch);
        tracing::info!("  snapshot         : {}", self.snapshot_path.display());
        tracing::info!("  local artifact   : {}", self.local_artifact_path.display());
        tracing::info!("  artifact name    : {}", self.artifact_name);
        tracing::info!(
            "  split            : {:.0}% test, seed {}",
            self.train.test_fraction * 100.0,
            self.train.seed
        );
    }
}

/// Keep the parameter names of a SAS query string and hide every value.
pub fn mask_sas_token(token: &str) -> String {
    token
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) => format!("{}=****", key),
            None => "****".to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
