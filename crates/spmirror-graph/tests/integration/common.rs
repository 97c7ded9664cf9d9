//! Shared test helpers for Graph API integration tests
//!
//! Provides wiremock-based mock server setup for the token endpoint and
//! SharePoint listing endpoints. Each helper mounts the necessary mocks
//! and returns a configured client pointing at the mock server.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spmirror_graph::client::GraphClient;
use spmirror_graph::connection::GraphConnection;

/// Mock token endpoint path (tenant-agnostic for tests).
pub const TOKEN_PATH: &str = "/test-tenant/oauth2/v2.0/token";

/// Mounts a token endpoint issuing `access_token` with the given lifetime.
pub async fn mount_token_endpoint(server: &MockServer, access_token: &str, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "access_token": access_token,
            "expires_in": expires_in
        })))
        .mount(server)
        .await;
}

/// Starts a mock server with a standard token endpoint and returns a
/// `(MockServer, GraphClient)` pair wired against it.
pub async fn setup_graph_mock() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "test-access-token", 3599).await;

    let connection = Arc::new(
        GraphConnection::with_token_url(
            "client-id",
            "client-secret",
            format!("{}{}", server.uri(), TOKEN_PATH),
        )
        .expect("valid token url"),
    );
    let client = GraphClient::with_base_url(connection, server.uri());

    (server, client)
}

/// Mounts a site lookup returning `site_id`.
pub async fn mount_site(server: &MockServer, host: &str, site: &str, site_id: &str) {
    let path_str = format!("/sites/{host}:/sites/{site}");
    Mock::given(method("GET"))
        .and(path(&path_str))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": site_id })),
        )
        .mount(server)
        .await;
}

/// Mounts a drives listing for a site.
pub async fn mount_drives(server: &MockServer, site_id: &str, drives: serde_json::Value) {
    let path_str = format!("/sites/{site_id}/drives");
    Mock::given(method("GET"))
        .and(path(&path_str))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": drives })),
        )
        .mount(server)
        .await;
}

/// Mounts a single-page children listing for the root of a drive.
pub async fn mount_root_children(server: &MockServer, drive_id: &str, items: serde_json::Value) {
    let path_str = format!("/drives/{drive_id}/root/children");
    Mock::given(method("GET"))
        .and(path(&path_str))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": items })),
        )
        .mount(server)
        .await;
}
