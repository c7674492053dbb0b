//! HTTP blob-container object store.
//!
//! Objects live at `{container_url}/{name}`. An optional shared-access
//! token is appended as the query string of every request. Uploads are sent
//! as block blobs, which replace the previous object in one operation.

use super::ObjectStore;
use crate::error::StoreError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request.
const USER_AGENT: &str = concat!("smogcast/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`HttpStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Container URL, e.g. `https://account.blob.core.windows.net/container`
    pub container_url: String,
    /// Shared-access token appended as query string (without leading `?`)
    pub sas_token: Option<String>,
    /// Per-request timeout; a timeout counts as a failed fetch or store
    pub timeout: Duration,
}

impl HttpStoreConfig {
    /// Settings with the default timeout and no token.
    pub fn new(container_url: impl Into<String>) -> Self {
        Self {
            container_url: container_url.into(),
            sas_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Attach a shared-access token.
    pub fn with_sas_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.sas_token = Some(token.trim_start_matches('?').to_string());
        self
    }

    /// Override the request timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Object store speaking plain GET/PUT to a blob container.
pub struct HttpStore {
    client: Client,
    config: HttpStoreConfig,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("container_url", &self.config.container_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpStore {
    /// Build a store client.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// URL addressing object `name`.
    pub fn object_url(&self, name: &str) -> String {
        let base = self.config.container_url.trim_end_matches('/');
        let name = name.trim_start_matches('/');
        match &self.config.sas_token {
            Some(token) if !token.is_empty() => format!("{}/{}?{}", base, name, token),
            _ => format!("{}/{}", base, name),
        }
    }
}

impl ObjectStore for HttpStore {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let response = self.client.get(self.object_url(name)).send()?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes()?.to_vec()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(name.to_string())),
            status => Err(StoreError::Unavailable {
                name: name.to_string(),
                reason: format!("HTTP {}", status),
            }),
        }
    }

    fn store(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.object_url(name))
            .header("x-ms-blob-type", "BlockBlob")
            .body(bytes.to_vec())
            .send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                name: name.to_string(),
                reason: format!("HTTP {}", status),
            })
        }
    }

    fn describe(&self) -> String {
        format!("blob container {}", self.config.container_url)
    }
}
