//! GraphDirectoryProvider - `IDirectoryProvider` implementation for
//! SharePoint document libraries via Microsoft Graph.
//!
//! Thin adapter over [`GraphClient`] and the [`sharepoint`](crate::sharepoint)
//! endpoint module. Name resolution (drives and children) is performed by
//! listing and matching case-insensitively, which is how the remote UI
//! treats names as well.

use anyhow::{Context, Result};
use tracing::debug;

use spmirror_core::ports::directory_provider::{FolderRef, IDirectoryProvider, RemoteEntry};

use crate::client::GraphClient;
use crate::sharepoint;

/// Directory provider backed by Microsoft Graph.
pub struct GraphDirectoryProvider {
    /// Authenticated Graph client.
    client: GraphClient,
    /// SharePoint host, e.g. `acme.sharepoint.com`.
    host: String,
}

impl GraphDirectoryProvider {
    /// Creates a provider for the given SharePoint host.
    pub fn new(client: GraphClient, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into(),
        }
    }
}

#[async_trait::async_trait]
impl IDirectoryProvider for GraphDirectoryProvider {
    /// Forces a token exchange so authentication problems surface before
    /// any sync work starts.
    async fn ensure_session(&self) -> Result<()> {
        self.client
            .connection()
            .access_token()
            .await
            .context("Failed to establish Graph session")?;
        Ok(())
    }

    async fn resolve_drive(&self, site: &str, drive: &str) -> Result<FolderRef> {
        let site_id = sharepoint::resolve_site_id(&self.client, &self.host, site).await?;
        let info = sharepoint::find_drive(&self.client, &site_id, drive)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Drive '{drive}' not found on site '{site}'"))?;

        debug!(site, drive, drive_id = %info.id, "Resolved drive");
        Ok(FolderRef::drive_root(info.id))
    }

    async fn resolve_child(
        &self,
        parent: &FolderRef,
        name: &str,
        require_folder: bool,
    ) -> Result<Option<RemoteEntry>> {
        let children = sharepoint::list_children(&self.client, parent).await?;
        Ok(children.into_iter().find(|entry| {
            entry.name.eq_ignore_ascii_case(name) && (!require_folder || entry.is_folder)
        }))
    }

    async fn list_children(&self, folder: &FolderRef) -> Result<Vec<RemoteEntry>> {
        sharepoint::list_children(&self.client, folder).await
    }

    async fn download(&self, entry: &RemoteEntry) -> Result<Vec<u8>> {
        if entry.is_folder {
            anyhow::bail!("Cannot download folder '{}'", entry.name);
        }
        let url = entry
            .download_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Entry '{}' has no download URL", entry.name))?;

        self.client
            .download(url)
            .await
            .with_context(|| format!("Failed to download '{}'", entry.name))
    }
}
