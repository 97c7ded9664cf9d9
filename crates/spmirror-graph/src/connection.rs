//! Client-credentials session for Microsoft Graph
//!
//! Implements the OAuth2 client-credentials flow for daemon-style access
//! (no user interaction): the app authenticates with its tenant ID, client
//! ID and secret, and receives a short-lived access token for the
//! `https://graph.microsoft.com/.default` scope.
//!
//! The session is shared by every worker. Token state lives behind an async
//! mutex, and [`GraphConnection::access_token`] re-authenticates under that
//! lock whenever the remaining validity drops below [`REFRESH_MARGIN_SECS`],
//! so concurrent workers never race a refresh.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oauth2::{
    basic::BasicClient, ClientId, ClientSecret, EndpointNotSet, EndpointSet, Scope, TokenResponse,
    TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Microsoft identity platform token endpoint, parameterised by tenant.
const TOKEN_URL_TEMPLATE: &str = "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token";

/// Scope requesting all application permissions granted to the app.
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Remaining validity (in seconds) below which the token is refreshed
/// before use.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// The oauth2 client type once the token endpoint is configured.
type CredentialsClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Cached session token state.
#[derive(Debug, Clone)]
struct SessionState {
    /// Bearer token for API requests.
    access_token: String,
    /// When the token stops being valid.
    expires_at: DateTime<Utc>,
}

/// Shared, refresh-on-demand Graph session.
pub struct GraphConnection {
    oauth: CredentialsClient,
    http: reqwest::Client,
    state: Mutex<Option<SessionState>>,
}

impl GraphConnection {
    /// Creates a connection for the given tenant using the standard
    /// Microsoft identity platform token endpoint.
    pub fn new(
        tenant_id: impl AsRef<str>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self> {
        let token_url = TOKEN_URL_TEMPLATE.replace("{tenant}", tenant_id.as_ref());
        Self::with_token_url(client_id, secret, token_url)
    }

    /// Creates a connection with a custom token endpoint (useful for testing).
    pub fn with_token_url(
        client_id: impl Into<String>,
        secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self> {
        let oauth = BasicClient::new(ClientId::new(client_id.into()))
            .set_client_secret(ClientSecret::new(secret.into()))
            .set_token_uri(TokenUrl::new(token_url.into()).context("Invalid token URL")?);

        Ok(Self {
            oauth,
            http: reqwest::Client::new(),
            state: Mutex::new(None),
        })
    }

    /// Returns a valid access token, authenticating or refreshing first
    /// when there is no token or it is within [`REFRESH_MARGIN_SECS`] of
    /// expiry.
    pub async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        let needs_refresh = match state.as_ref() {
            None => true,
            Some(s) => s.expires_at - Utc::now() < ChronoDuration::seconds(REFRESH_MARGIN_SECS),
        };

        if needs_refresh {
            *state = Some(self.authenticate().await?);
        }

        // The option was just filled on the refresh path.
        Ok(state
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_default())
    }

    /// Remaining validity of the cached token, if any. Exposed for tests
    /// and diagnostics.
    pub async fn remaining_validity(&self) -> Option<ChronoDuration> {
        let state = self.state.lock().await;
        state.as_ref().map(|s| s.expires_at - Utc::now())
    }

    /// Performs the client-credentials token exchange.
    async fn authenticate(&self) -> Result<SessionState> {
        debug!("Requesting Graph access token (client credentials)");

        let token = self
            .oauth
            .exchange_client_credentials()
            .add_scope(Scope::new(GRAPH_SCOPE.to_string()))
            .request_async(&self.http)
            .await
            .context("Client-credentials token exchange failed")?;

        let expires_at = token
            .expires_in()
            .map(|d| Utc::now() + ChronoDuration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + ChronoDuration::hours(1));

        info!(%expires_at, "Graph session established");

        Ok(SessionState {
            access_token: token.access_token().secret().to_string(),
            expires_at,
        })
    }
}
