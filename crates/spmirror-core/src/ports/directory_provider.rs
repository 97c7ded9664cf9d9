//! Remote directory provider port (driven/secondary port)
//!
//! This module defines the interface for the remote hierarchical document
//! store the engine mirrors from. The primary implementation targets
//! SharePoint document libraries via the Microsoft Graph API, but the trait
//! is provider-agnostic and the engine never sees Graph types.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification; the engine
//!   classifies transient vs. fatal at its own boundary.
//! - `RemoteEntry` is a port-level DTO produced per listing call; it is
//!   never persisted.
//! - Implementations own pagination: `list_children` must return the
//!   logically complete child list, following continuation links as needed.
//! - Implementations own the rate-limit contract: a throttled request is
//!   retried once transparently after a fixed delay before any error
//!   surfaces to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// FolderRef
// ============================================================================

/// Opaque handle to a folder on a remote drive.
///
/// `item_id == None` denotes the root of the drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    /// Provider-specific drive identifier.
    pub drive_id: String,
    /// Provider-specific folder item identifier; `None` for the drive root.
    pub item_id: Option<String>,
}

impl FolderRef {
    /// Handle to the root folder of a drive.
    pub fn drive_root(drive_id: impl Into<String>) -> Self {
        Self {
            drive_id: drive_id.into(),
            item_id: None,
        }
    }

    /// Handle to a child folder entry of `parent`.
    pub fn child_of(parent: &FolderRef, entry: &RemoteEntry) -> Self {
        Self {
            drive_id: parent.drive_id.clone(),
            item_id: Some(entry.id.clone()),
        }
    }
}

// ============================================================================
// RemoteEntry
// ============================================================================

/// A single child entry from a remote folder listing.
///
/// Ephemeral: produced per listing call and discarded after the folder
/// that requested it has been reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Provider-specific item identifier.
    pub id: String,
    /// Entry name (file or folder name).
    pub name: String,
    /// Whether this entry is a folder.
    pub is_folder: bool,
    /// Last modification timestamp, when the provider reports one.
    pub last_modified: Option<DateTime<Utc>>,
    /// Download reference for files (pre-signed URL); `None` for folders.
    pub download_url: Option<String>,
}

// ============================================================================
// IDirectoryProvider trait
// ============================================================================

/// Port trait for the remote directory store.
///
/// All remote access the sync engine performs goes through this interface.
///
/// ## Implementation Notes
///
/// - `ensure_session` is called by the run controller before any workers
///   start; it is the one place where an authentication failure surfaces to
///   the caller of a run.
/// - Every other method must transparently refresh credentials before
///   issuing a request whenever remaining validity drops below the
///   provider's safety margin.
/// - Name matching in `resolve_drive` and `resolve_child` is
///   case-insensitive.
#[async_trait::async_trait]
pub trait IDirectoryProvider: Send + Sync {
    /// Establishes (or refreshes) the authenticated session.
    ///
    /// # Errors
    /// Returns an error when authentication fails; such a failure aborts
    /// the run before any worker starts.
    async fn ensure_session(&self) -> anyhow::Result<()>;

    /// Resolves a drive (document library) by site and drive display name.
    ///
    /// # Arguments
    /// * `site` - Site name as it appears in the site URL
    /// * `drive` - Drive display name, matched case-insensitively
    ///
    /// # Returns
    /// A [`FolderRef`] addressing the drive root.
    async fn resolve_drive(&self, site: &str, drive: &str) -> anyhow::Result<FolderRef>;

    /// Looks up an immediate child of `parent` by name.
    ///
    /// # Arguments
    /// * `parent` - The folder to search in
    /// * `name` - Child name, matched case-insensitively
    /// * `require_folder` - When true, only folder entries match
    ///
    /// # Returns
    /// `Some(entry)` when a matching child exists, `None` otherwise.
    async fn resolve_child(
        &self,
        parent: &FolderRef,
        name: &str,
        require_folder: bool,
    ) -> anyhow::Result<Option<RemoteEntry>>;

    /// Lists the immediate children of a folder.
    ///
    /// The returned sequence is logically complete: implementations follow
    /// pagination/continuation until every entry has been retrieved.
    async fn list_children(&self, folder: &FolderRef) -> anyhow::Result<Vec<RemoteEntry>>;

    /// Downloads a file entry's content.
    ///
    /// # Errors
    /// Returns an error for folders, entries without a download reference,
    /// or transport failures.
    async fn download(&self, entry: &RemoteEntry) -> anyhow::Result<Vec<u8>>;
}
