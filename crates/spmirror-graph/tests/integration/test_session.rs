//! Integration tests for the client-credentials session
//!
//! Verifies token caching, the <60 s refresh margin, and bearer
//! propagation onto API requests.

use std::sync::Arc;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spmirror_graph::client::GraphClient;
use spmirror_graph::connection::GraphConnection;

use crate::common;

async fn connection_against(server: &MockServer, expires_in: u64) -> Arc<GraphConnection> {
    common::mount_token_endpoint(server, "test-access-token", expires_in).await;
    Arc::new(
        GraphConnection::with_token_url(
            "client-id",
            "client-secret",
            format!("{}{}", server.uri(), common::TOKEN_PATH),
        )
        .expect("valid token url"),
    )
}

async fn token_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == common::TOKEN_PATH)
        .count()
}

#[tokio::test]
async fn token_is_fetched_once_and_cached() {
    let server = MockServer::start().await;
    let connection = connection_against(&server, 3599).await;

    let first = connection.access_token().await.expect("first token");
    let second = connection.access_token().await.expect("second token");

    assert_eq!(first, "test-access-token");
    assert_eq!(second, "test-access-token");
    assert_eq!(token_requests(&server).await, 1);
}

#[tokio::test]
async fn token_near_expiry_triggers_refresh() {
    let server = MockServer::start().await;
    // 30 s lifetime is already inside the 60 s refresh margin.
    let connection = connection_against(&server, 30).await;

    connection.access_token().await.expect("first token");
    connection.access_token().await.expect("second token");

    assert_eq!(token_requests(&server).await, 2);
}

#[tokio::test]
async fn remaining_validity_reflects_token_lifetime() {
    let server = MockServer::start().await;
    let connection = connection_against(&server, 3599).await;

    connection.access_token().await.expect("token");
    let remaining = connection
        .remaining_validity()
        .await
        .expect("token is cached");

    assert!(remaining.num_seconds() > 3500);
    assert!(remaining.num_seconds() <= 3599);
}

#[tokio::test]
async fn api_requests_carry_bearer_token() {
    let (server, client) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/acme.sharepoint.com:/sites/Personnel"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "site-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let site_id =
        spmirror_graph::sharepoint::resolve_site_id(&client, "acme.sharepoint.com", "Personnel")
            .await
            .expect("site resolution");

    assert_eq!(site_id, "site-1");
}

#[tokio::test]
async fn authentication_failure_surfaces_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "bad secret"
        })))
        .mount(&server)
        .await;

    let connection = Arc::new(
        GraphConnection::with_token_url(
            "client-id",
            "wrong-secret",
            format!("{}{}", server.uri(), common::TOKEN_PATH),
        )
        .unwrap(),
    );
    let client = GraphClient::with_base_url(Arc::clone(&connection), server.uri());

    assert!(connection.access_token().await.is_err());
    // An authenticated API call fails the same way before any request is sent.
    let result =
        spmirror_graph::sharepoint::resolve_site_id(&client, "acme.sharepoint.com", "Personnel")
            .await;
    assert!(result.is_err());
}
