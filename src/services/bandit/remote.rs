//! Remote sources for a pre-trained global model
//!
//! A snapshot source is only consulted once, when the engine starts. Anything it
//! returns still goes through the store's validation, so a source only has to
//! hand back raw bytes.
use reqwest::Client as HttpClient;

use super::{BanditError, BanditResult};

/// Read-only provider of a serialized global model
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Downloads the full global snapshot
    async fn fetch_global(&self) -> BanditResult<Vec<u8>>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// Hugging Face Hub style repository holding `bandit/global.state.json`
#[derive(Clone)]
pub struct HubSnapshotSource {
    http_client: HttpClient,
    base_url: String,
    repo_id: String,
}

impl HubSnapshotSource {
    pub fn new(base_url: impl Into<String>, repo_id: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.into(),
            repo_id: repo_id.into(),
        }
    }

    pub fn snapshot_url(&self) -> String {
        format!(
            "{}/{}/resolve/main/bandit/global.state.json",
            self.base_url.trim_end_matches('/'),
            self.repo_id.trim_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HubSnapshotSource {
    async fn fetch_global(&self) -> BanditResult<Vec<u8>> {
        let url = self.snapshot_url();
        tracing::debug!(url = %url, "Fetching global bandit snapshot");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| BanditError::PersistenceUnavailable(format!("snapshot request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BanditError::PersistenceUnavailable(format!(
                "snapshot download returned {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BanditError::PersistenceUnavailable(format!("snapshot body unreadable: {}", e)))?;

        tracing::info!(repo_id = %self.repo_id, size = bytes.len(), "Downloaded global bandit snapshot");
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "huggingface-hub"
    }
}
