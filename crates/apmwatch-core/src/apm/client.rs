//! HTTP client for the APM search backend

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::ApmConfig;
use crate::error::{Error, Result};
use crate::models::{Sample, SearchResponse};

/// Runs latency searches against one index pattern
#[derive(Debug, Clone)]
pub struct MetricsClient {
    client: Client,
    search_url: String,
}

impl MetricsClient {
    /// Create a client with the configured request timeout
    pub fn new(config: &ApmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.search_url()))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_client(client: Client, search_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
        }
    }

    /// Endpoint every search is posted to
    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Execute `query` once and flatten the hits into raw samples
    pub async fn fetch_samples(&self, query: &Value) -> Result<Vec<Sample>> {
        debug!(url = %self.search_url, "Querying metrics backend");

        let response = self
            .client
            .post(&self.search_url)
            .json(query)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Response {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(Error::Transport)?;
        let parsed: SearchResponse = serde_json::from_str(&body)?;
        let hits = parsed.hits.hits.len();
        let samples = parsed.into_samples();

        debug!(hits, samples = samples.len(), "Metrics backend responded");
        Ok(samples)
    }
}
