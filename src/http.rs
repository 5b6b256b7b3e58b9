//! Shared outbound HTTP plumbing for every upstream client.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

use crate::json::decode_json;
use crate::utils::log_if_slow;

/// Responses slower than this are logged at `warn`.
const SLOW_RESPONSE: Duration = Duration::from_secs(3);

/// Maximum number of body characters echoed into an error on non-2xx responses.
const ERROR_BODY_PREVIEW: usize = 200;

/// Build a client with the shared user agent and per-request timeout.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Send `request` and return the body, failing on transport errors or non-2xx status.
pub async fn fetch_text(request: RequestBuilder, source: &str) -> Result<String> {
    let start = Instant::now();
    let response = request
        .send()
        .await
        .with_context(|| format!("{source} request failed"))?;

    let status = response.status();
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read {source} response body"))?;
    log_if_slow(start, SLOW_RESPONSE, source);

    if !status.is_success() {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        anyhow::bail!("{source} returned HTTP {status} for {url}: {preview}");
    }

    Ok(body)
}

/// Like [`fetch_text`], then decode the body as JSON.
pub async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, source: &str) -> Result<T> {
    let body = fetch_text(request, source).await?;
    decode_json(&body).with_context(|| format!("Failed to decode {source} response"))
}
