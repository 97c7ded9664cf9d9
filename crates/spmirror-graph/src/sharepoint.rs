//! SharePoint endpoints and response mapping
//!
//! Resolves sites, drives (document libraries) and folder listings through
//! Microsoft Graph:
//!
//! - `GET /sites/{host}:/sites/{name}?$select=id` - site lookup
//! - `GET /sites/{siteId}/drives` - drives of a site
//! - `GET /drives/{driveId}/root/children` - drive root listing
//! - `GET /drives/{driveId}/items/{itemId}/children` - folder listing
//!
//! Listings are paginated; [`list_children`] follows `@odata.nextLink`
//! until the sequence is complete, so callers always see the full child
//! list of a folder in one call. When a page reports `@odata.count`, a
//! shortfall against the accumulated total is logged (the count is
//! advisory on these endpoints).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use spmirror_core::ports::directory_provider::{FolderRef, RemoteEntry};

use crate::client::GraphClient;

// ============================================================================
// Graph API response types (JSON deserialization)
// ============================================================================

/// Response from a site lookup (`$select=id`).
#[derive(Debug, Deserialize)]
struct SiteResponse {
    /// Composite site identifier.
    id: String,
}

/// Collection wrapper for the drives listing.
#[derive(Debug, Deserialize)]
struct DriveCollection {
    #[serde(default)]
    value: Vec<DriveInfo>,
}

/// A drive (document library) on a site.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveInfo {
    /// Drive identifier.
    pub id: String,
    /// Display name, e.g. "Documents".
    #[serde(default)]
    pub name: String,
}

/// One page of a folder children listing.
#[derive(Debug, Deserialize)]
struct ChildrenPage {
    #[serde(default)]
    value: Vec<DriveItem>,

    /// URL for the next page of results (present when more pages exist).
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,

    /// Total entry count reported by the service, when requested/available.
    #[serde(rename = "@odata.count")]
    count: Option<u64>,
}

/// A drive item from a children listing.
///
/// The presence of the `folder` facet marks folders. File modification
/// times come from `fileSystemInfo` (the client-observed timestamp), with
/// the item-level timestamp as a fallback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    /// Unique identifier of the item within the drive.
    id: String,

    /// Name of the item (filename or folder name).
    #[serde(default)]
    name: String,

    /// Folder facet (present if the item is a folder).
    folder: Option<FolderFacet>,

    /// Filesystem metadata facet.
    file_system_info: Option<FileSystemInfo>,

    /// Item-level last modified timestamp.
    last_modified_date_time: Option<DateTime<Utc>>,

    /// Pre-signed, short-lived download URL (files only).
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

/// Folder facet indicating the item is a folder.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderFacet {
    /// Number of immediate children in the folder.
    #[allow(dead_code)]
    child_count: Option<u64>,
}

/// Filesystem metadata facet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileSystemInfo {
    /// Client-observed last modification time.
    last_modified_date_time: Option<DateTime<Utc>>,
}

/// Converts a raw drive item into a port-level [`RemoteEntry`].
fn item_to_entry(item: DriveItem) -> RemoteEntry {
    let last_modified = item
        .file_system_info
        .as_ref()
        .and_then(|fsi| fsi.last_modified_date_time)
        .or(item.last_modified_date_time);

    RemoteEntry {
        is_folder: item.folder.is_some(),
        id: item.id,
        name: item.name,
        last_modified,
        download_url: item.download_url,
    }
}

// ============================================================================
// Site and drive resolution
// ============================================================================

/// Looks up a site by host and site name, returning its identifier.
pub async fn resolve_site_id(client: &GraphClient, host: &str, site: &str) -> Result<String> {
    let path = format!("/sites/{host}:/sites/{site}?$select=id");
    let response: SiteResponse = client
        .get_json(&path)
        .await
        .with_context(|| format!("Failed to resolve site '{site}' on host '{host}'"))?;
    debug!(site, id = %response.id, "Resolved SharePoint site");
    Ok(response.id)
}

/// Lists the drives (document libraries) of a site.
pub async fn list_drives(client: &GraphClient, site_id: &str) -> Result<Vec<DriveInfo>> {
    let path = format!("/sites/{site_id}/drives");
    let response: DriveCollection = client
        .get_json(&path)
        .await
        .with_context(|| format!("Failed to list drives of site '{site_id}'"))?;
    Ok(response.value)
}

/// Finds a drive by display name, matching case-insensitively.
pub async fn find_drive(
    client: &GraphClient,
    site_id: &str,
    name: &str,
) -> Result<Option<DriveInfo>> {
    let drives = list_drives(client, site_id).await?;
    Ok(drives
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(name)))
}

// ============================================================================
// Folder listings
// ============================================================================

/// Path of the children endpoint for a folder reference.
fn children_path(folder: &FolderRef) -> String {
    match &folder.item_id {
        Some(item_id) => format!("/drives/{}/items/{}/children", folder.drive_id, item_id),
        None => format!("/drives/{}/root/children", folder.drive_id),
    }
}

/// Lists the immediate children of a folder, following pagination until
/// the sequence is complete.
pub async fn list_children(client: &GraphClient, folder: &FolderRef) -> Result<Vec<RemoteEntry>> {
    let mut url = children_path(folder);
    let mut entries: Vec<RemoteEntry> = Vec::new();
    let mut reported_count: Option<u64> = None;
    let mut pages: u32 = 0;

    loop {
        pages += 1;
        let page: ChildrenPage = client
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to list children (page {pages})"))?;

        if reported_count.is_none() {
            reported_count = page.count;
        }
        entries.extend(page.value.into_iter().map(item_to_entry));

        match page.next_link {
            Some(next) => {
                debug!(page = pages, entries = entries.len(), "Following next page");
                url = next;
            }
            None => break,
        }
    }

    if let Some(count) = reported_count {
        if (entries.len() as u64) < count {
            warn!(
                expected = count,
                received = entries.len(),
                "Listing ended short of the reported entry count"
            );
        }
    }

    debug!(
        entries = entries.len(),
        pages,
        drive = %folder.drive_id,
        "Folder listing complete"
    );

    Ok(entries)
}

// ============================================================================
// Tests
// ============================================================================
