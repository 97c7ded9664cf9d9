//! Integration tests for the transport contract: downloads and the
//! single transparent retry on HTTP 429.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spmirror_core::ports::directory_provider::{FolderRef, IDirectoryProvider, RemoteEntry};
use spmirror_graph::provider::GraphDirectoryProvider;
use spmirror_graph::sharepoint;

use crate::common;

fn entry_with_download(server: &MockServer, id: &str, name: &str) -> RemoteEntry {
    RemoteEntry {
        id: id.to_string(),
        name: name.to_string(),
        is_folder: false,
        last_modified: None,
        download_url: Some(format!("{}/content/{id}", server.uri())),
    }
}

#[tokio::test]
async fn download_returns_file_bytes() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/content/i-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
        .mount(&server)
        .await;

    let provider = GraphDirectoryProvider::new(client, "acme.sharepoint.com");
    let entry = entry_with_download(&server, "i-1", "hello.txt");

    let bytes = provider.download(&entry).await.expect("download");
    assert_eq!(bytes, b"hello world");
}

#[tokio::test]
async fn download_rejects_entries_without_url() {
    let (_server, client) = common::setup_graph_mock().await;
    let provider = GraphDirectoryProvider::new(client, "acme.sharepoint.com");

    let entry = RemoteEntry {
        id: "i-1".into(),
        name: "no-url.txt".into(),
        is_folder: false,
        last_modified: None,
        download_url: None,
    };
    assert!(provider.download(&entry).await.is_err());

    let folder = RemoteEntry {
        id: "f-1".into(),
        name: "Reports".into(),
        is_folder: true,
        last_modified: None,
        download_url: None,
    };
    assert!(provider.download(&folder).await.is_err());
}

#[tokio::test]
async fn throttled_request_is_retried_once_then_succeeds() {
    let (server, client) = common::setup_graph_mock().await;

    // First hit is throttled, the transparent retry then succeeds.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/children"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{"id": "i-1", "name": "a.txt", "file": {}}]
        })))
        .mount(&server)
        .await;

    let entries = sharepoint::list_children(&client, &FolderRef::drive_root("drive-1"))
        .await
        .expect("listing after retry");

    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn persistent_throttling_surfaces_after_single_retry() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/children"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2) // original attempt + exactly one retry
        .mount(&server)
        .await;

    let result = sharepoint::list_children(&client, &FolderRef::drive_root("drive-1")).await;
    let err = format!("{:#}", result.expect_err("should fail"));
    assert!(err.to_lowercase().contains("too many requests"), "{err}");
}
