//! HTTP layer for Microsoft Graph API calls
//!
//! Wraps `reqwest` with bearer authentication from the shared
//! [`GraphConnection`] and the transport contract every request follows:
//! an HTTP 429 response causes a fixed 1.5 s sleep and exactly one
//! transparent retry of the same request; any other non-success status is
//! mapped to a [`GraphError`] and surfaced to the caller.
//!
//! Downloads use pre-signed URLs that embed their own authorisation, so
//! [`GraphClient::download`] sends no Authorization header.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{connection::GraphConnection, GraphError};

/// Base URL for Microsoft Graph API v1.0
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Fixed delay before the single transparent retry of a throttled request.
pub const RATE_LIMIT_RETRY_DELAY: Duration = Duration::from_millis(1500);

/// HTTP client for Microsoft Graph API calls.
pub struct GraphClient {
    /// Shared session providing bearer tokens.
    connection: Arc<GraphConnection>,
    /// The underlying HTTP client.
    client: reqwest::Client,
    /// Base URL for API requests.
    base_url: String,
}

impl GraphClient {
    /// Creates a new client against the production Graph endpoint.
    pub fn new(connection: Arc<GraphConnection>) -> Self {
        Self::with_base_url(connection, GRAPH_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing).
    pub fn with_base_url(connection: Arc<GraphConnection>, base_url: impl Into<String>) -> Self {
        Self {
            connection,
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Returns the shared session.
    pub fn connection(&self) -> &Arc<GraphConnection> {
        &self.connection
    }

    /// Returns the base URL for API requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a request path against the base URL. Absolute URLs (e.g.
    /// continuation links, which Graph returns fully qualified) pass through.
    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Performs an authenticated GET and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.absolute(path);
        let response = self.get_with_retry(&url, true).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }

    /// Downloads raw bytes from a pre-signed URL (no Authorization header).
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get_with_retry(url, false).await?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to read download body")?;
        debug!(bytes = bytes.len(), "Downloaded file content");
        Ok(bytes.to_vec())
    }

    /// Sends a GET request under the transport contract: one transparent
    /// retry after [`RATE_LIMIT_RETRY_DELAY`] on HTTP 429, every other
    /// non-success status mapped to a [`GraphError`].
    async fn get_with_retry(&self, url: &str, authorized: bool) -> Result<reqwest::Response> {
        for attempt in 0..2u32 {
            let mut request = self.client.get(url);
            if authorized {
                let token = self.connection.access_token().await?;
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .map_err(GraphError::NetworkError)
                .with_context(|| format!("Request to {url} failed"))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS && attempt == 0 {
                warn!(%url, "Request throttled (429), retrying once");
                tokio::time::sleep(RATE_LIMIT_RETRY_DELAY).await;
                continue;
            }

            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, url, &detail).into());
        }

        Err(anyhow::anyhow!(
            "Request failed: retry loop exited unexpectedly for {url}"
        ))
    }
}

/// Maps a non-success HTTP status to the matching [`GraphError`] variant.
fn classify_status(status: StatusCode, url: &str, detail: &str) -> GraphError {
    let summary = if detail.is_empty() {
        format!("{status} from {url}")
    } else {
        // Response bodies can be large HTML error pages; keep logs sane.
        let detail: String = detail.chars().take(300).collect();
        format!("{status} from {url}: {detail}")
    };

    match status {
        StatusCode::UNAUTHORIZED => GraphError::Unauthorized(summary),
        StatusCode::FORBIDDEN => GraphError::Forbidden(summary),
        StatusCode::NOT_FOUND => GraphError::NotFound(summary),
        StatusCode::TOO_MANY_REQUESTS => GraphError::TooManyRequests {
            retry_after: RATE_LIMIT_RETRY_DELAY,
        },
        s if s.is_server_error() => GraphError::ServerError(summary),
        _ => GraphError::InvalidResponse(summary),
    }
}
