//! spmirror Graph - Microsoft Graph API adapter
//!
//! Provides async access to SharePoint document libraries via Microsoft
//! Graph:
//! - Client-credentials authentication with automatic token refresh
//! - Site, drive and folder resolution
//! - Paginated folder listings
//! - File downloads via pre-signed URLs
//!
//! ## Modules
//!
//! - [`connection`] - Client-credentials session with expiry-driven refresh
//! - [`client`] - HTTP layer with the rate-limit retry contract
//! - [`sharepoint`] - SharePoint endpoints and response mapping
//! - [`provider`] - `IDirectoryProvider` implementation

pub mod client;
pub mod connection;
pub mod provider;
pub mod sharepoint;

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded even after the transparent retry
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
