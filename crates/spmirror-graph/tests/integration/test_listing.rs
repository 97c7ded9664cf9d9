//! Integration tests for site/drive resolution and folder listings

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use spmirror_core::ports::directory_provider::{FolderRef, IDirectoryProvider};
use spmirror_graph::provider::GraphDirectoryProvider;
use spmirror_graph::sharepoint;

use crate::common;

#[tokio::test]
async fn resolve_drive_matches_name_case_insensitively() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_site(&server, "acme.sharepoint.com", "Personnel", "site-1").await;
    common::mount_drives(
        &server,
        "site-1",
        serde_json::json!([
            {"id": "drive-a", "name": "Site Assets"},
            {"id": "drive-b", "name": "Documents"}
        ]),
    )
    .await;

    let provider = GraphDirectoryProvider::new(client, "acme.sharepoint.com");
    let drive = provider
        .resolve_drive("Personnel", "documents")
        .await
        .expect("drive resolution");

    assert_eq!(drive, FolderRef::drive_root("drive-b"));
}

#[tokio::test]
async fn resolve_drive_fails_for_unknown_name() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_site(&server, "acme.sharepoint.com", "Personnel", "site-1").await;
    common::mount_drives(
        &server,
        "site-1",
        serde_json::json!([{"id": "drive-a", "name": "Documents"}]),
    )
    .await;

    let provider = GraphDirectoryProvider::new(client, "acme.sharepoint.com");
    assert!(provider.resolve_drive("Personnel", "Missing").await.is_err());
}

#[tokio::test]
async fn list_children_maps_files_and_folders() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_root_children(
        &server,
        "drive-1",
        serde_json::json!([
            {
                "id": "f-1",
                "name": "Reports",
                "folder": {"childCount": 3}
            },
            {
                "id": "i-1",
                "name": "notes.txt",
                "file": {},
                "fileSystemInfo": {"lastModifiedDateTime": "2026-04-01T10:00:00Z"},
                "@microsoft.graph.downloadUrl": "https://download.example/notes"
            }
        ]),
    )
    .await;

    let entries = sharepoint::list_children(&client, &FolderRef::drive_root("drive-1"))
        .await
        .expect("listing");

    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_folder);
    assert_eq!(entries[0].name, "Reports");
    assert!(!entries[1].is_folder);
    assert!(entries[1].last_modified.is_some());
    assert_eq!(
        entries[1].download_url.as_deref(),
        Some("https://download.example/notes")
    );
}

#[tokio::test]
async fn list_children_follows_next_link_until_complete() {
    let (server, client) = common::setup_graph_mock().await;

    // Page 1 carries a continuation link back into the mock server.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "@odata.count": 3,
            "value": [
                {"id": "i-1", "name": "a.txt", "file": {}},
                {"id": "i-2", "name": "b.txt", "file": {}}
            ],
            "@odata.nextLink": format!(
                "{}/drives/drive-1/root/children?$skiptoken=page2",
                server.uri()
            )
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Page 2 is addressed by the continuation link (query distinguishes it).
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/children"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {"id": "i-3", "name": "c.txt", "file": {}}
            ]
        })))
        .mount(&server)
        .await;

    let entries = sharepoint::list_children(&client, &FolderRef::drive_root("drive-1"))
        .await
        .expect("paginated listing");

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
}

#[tokio::test]
async fn resolve_child_requires_folder_when_asked() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_root_children(
        &server,
        "drive-1",
        serde_json::json!([
            {"id": "i-1", "name": "Budget", "file": {}},
            {"id": "f-1", "name": "budget", "folder": {}}
        ]),
    )
    .await;

    let provider = GraphDirectoryProvider::new(client, "acme.sharepoint.com");
    let root = FolderRef::drive_root("drive-1");

    let as_folder = provider
        .resolve_child(&root, "Budget", true)
        .await
        .expect("lookup")
        .expect("folder match");
    assert_eq!(as_folder.id, "f-1");

    let any = provider
        .resolve_child(&root, "Budget", false)
        .await
        .expect("lookup")
        .expect("any match");
    assert_eq!(any.id, "i-1");
}

#[tokio::test]
async fn resolve_child_returns_none_for_missing_name() {
    let (server, client) = common::setup_graph_mock().await;
    common::mount_root_children(&server, "drive-1", serde_json::json!([])).await;

    let provider = GraphDirectoryProvider::new(client, "acme.sharepoint.com");
    let found = provider
        .resolve_child(&FolderRef::drive_root("drive-1"), "Anything", true)
        .await
        .expect("lookup");
    assert!(found.is_none());
}

#[tokio::test]
async fn listing_error_status_is_surfaced() {
    let (server, client) = common::setup_graph_mock().await;
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/children"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": "itemNotFound"}
        })))
        .mount(&server)
        .await;

    let result = sharepoint::list_children(&client, &FolderRef::drive_root("drive-1")).await;
    assert!(result.is_err());
}
