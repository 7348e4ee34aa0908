//! HTTP client plumbing shared by the upstream sources

use anyhow::Context;
use std::time::Duration;
use tracing::warn;
use crate::errors::{SimError, SimResult};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn build_client(source: &str) -> SimResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| {
            warn!("⚠️ Failed to initialize HTTP client for {}: {}", source, e);
            SimError::UpstreamFetch {
                message: format!("Failed to build HTTP client for {}", source),
                source: Some(e.into()),
                retry_count: 0,
            }
        })
}

/// GETs `url` and parses the body as JSON. A non-2xx status is an error carrying the body.
pub(crate) async fn get_json(client: &reqwest::Client, url: &str) -> anyhow::Result<serde_json::Value> {
    let response = client
        .get(url)
        .send()
        .await
        .context("HTTP request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("HTTP {} - {}", status, body);
    }

    response
        .json()
        .await
        .context("Failed to parse JSON response")
}
