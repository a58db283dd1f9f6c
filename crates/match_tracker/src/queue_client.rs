//! Delayed queue cleanup goes through the queue-management API, not the store.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[async_trait]
pub trait QueueRemover: Send + Sync {
    async fn remove_queue_entry(&self, queue_id: i64) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// `DELETE {base}/api/match-queue/{id}` against `tracker-api`.
pub struct HttpQueueClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpQueueClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, queue_id: i64) -> String {
        format!("{}/api/match-queue/{}", self.base_url, queue_id)
    }
}

#[async_trait]
impl QueueRemover for HttpQueueClient {
    async fn remove_queue_entry(&self, queue_id: i64) -> Result<()> {
        let url = self.endpoint(queue_id);
        let resp = self
            .http
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("DELETE {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("API DELETE request failed with status {status}");
        }

        let body: DeleteResponse = resp.json().await.context("Failed to decode queue delete response")?;
        if !body.success {
            bail!(
                "API responded but failed to remove match from queue: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(())
    }
}
