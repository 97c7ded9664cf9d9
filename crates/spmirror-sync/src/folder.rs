//! Folder task execution
//!
//! A folder task mirrors one remote folder into one local directory:
//!
//! 1. Normalize the relative path and resolve it segment by segment from
//!    the drive root, requiring every intermediate match to be a folder.
//! 2. List the resolved folder's children (the provider paginates
//!    transparently).
//! 3. Subfolders: ensure the local directory exists and enqueue a new
//!    folder task. Recursion is expressed as enqueue so sibling subtrees
//!    parallelize across workers and stack depth stays bounded.
//! 4. Files: sync inline (see [`crate::file`]) and collect each confirmed
//!    local path into the folder's expected set.
//! 5. Reconcile: delete every local file in this directory that is not in
//!    the expected set, notifying the observer per deletion.
//!
//! If resolution or listing fails, the task aborts before step 5: a folder
//! whose enumeration never completed has nothing deleted. File-level
//! failures do not abort the task, but the affected file stays out of the
//! expected set: remote state is the source of truth, and a copy that
//! could not be confirmed this run is deleted like any other orphan.
//!
//! File-level operations live in [`crate::file`] as a second impl block of
//! [`TaskRunner`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use spmirror_core::config::EngineConfig;
use spmirror_core::ports::directory_provider::{FolderRef, IDirectoryProvider};
use spmirror_core::ports::notification::{ISyncObserver, SyncEvent};

use crate::context::RunContext;
use crate::pool::{FolderTask, TaskHandler, TaskQueue};
use crate::SyncError;

// ============================================================================
// RetryPolicy
// ============================================================================

/// Fixed retry policy for transient download faults.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum download attempts per file.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl From<&EngineConfig> for RetryPolicy {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            attempts: engine.download_attempts.max(1),
            delay: Duration::from_millis(engine.retry_delay_ms),
        }
    }
}

// ============================================================================
// TaskRunner
// ============================================================================

/// Executes folder and file sync tasks against the shared services.
pub struct TaskRunner {
    provider: Arc<dyn IDirectoryProvider>,
    observer: Arc<dyn ISyncObserver>,
    ctx: Arc<RunContext>,
    queue: TaskQueue,
    retry: RetryPolicy,
}

impl TaskRunner {
    pub fn new(
        provider: Arc<dyn IDirectoryProvider>,
        observer: Arc<dyn ISyncObserver>,
        ctx: Arc<RunContext>,
        queue: TaskQueue,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            observer,
            ctx,
            queue,
            retry,
        }
    }

    pub(crate) fn provider(&self) -> &Arc<dyn IDirectoryProvider> {
        &self.provider
    }

    pub(crate) fn observer(&self) -> &Arc<dyn ISyncObserver> {
        &self.observer
    }

    pub(crate) fn context(&self) -> &Arc<RunContext> {
        &self.ctx
    }

    pub(crate) fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Mirrors one remote folder into `task.local_dir`.
    pub async fn run_folder(&self, task: FolderTask) -> Result<()> {
        self.ctx.touch();

        let segments = path_segments(&task.remote_path);
        let folder = self
            .resolve_folder(&task.drive, &task.remote_path, &segments)
            .await?;

        let children = self
            .provider
            .list_children(&folder)
            .await
            .with_context(|| format!("Failed to list remote folder '{}'", task.remote_path))?;
        self.ctx.touch();

        tokio::fs::create_dir_all(&task.local_dir)
            .await
            .with_context(|| {
                format!("Failed to create local directory {}", task.local_dir.display())
            })?;

        debug!(
            path = %task.remote_path,
            children = children.len(),
            local = %task.local_dir.display(),
            "Remote folder enumerated"
        );

        let mut expected: HashSet<PathBuf> = HashSet::new();
        for child in &children {
            self.ctx.touch();

            // Listing entries are single path components; anything else
            // would escape this folder's directory.
            if child.name.is_empty() || child.name.contains(['/', '\\']) {
                warn!(name = %child.name, "Skipping entry with unusable name");
                continue;
            }

            if child.is_folder {
                let sub_dir = task.local_dir.join(&child.name);
                tokio::fs::create_dir_all(&sub_dir).await.with_context(|| {
                    format!("Failed to create local directory {}", sub_dir.display())
                })?;
                self.queue.push(FolderTask {
                    remote_path: join_remote(&task.remote_path, &child.name),
                    drive: task.drive.clone(),
                    local_dir: sub_dir,
                });
            } else {
                match self.sync_file(child, &task.local_dir).await {
                    Ok(path) => {
                        expected.insert(canonical(&path));
                    }
                    Err(err) => {
                        warn!(
                            file = %child.name,
                            error = %format!("{err:#}"),
                            "File sync failed; leaving it out of this folder's expected set"
                        );
                        self.ctx.record_failure();
                    }
                }
            }
        }

        self.reconcile(&task.local_dir, &expected).await?;
        Ok(())
    }

    /// Walks `segments` from the drive root, requiring each match to be a
    /// folder. An empty segment list addresses the drive root itself.
    async fn resolve_folder(
        &self,
        drive: &FolderRef,
        remote_path: &str,
        segments: &[&str],
    ) -> Result<FolderRef> {
        let mut current = drive.clone();
        for segment in segments {
            self.ctx.touch();
            let entry = self
                .provider
                .resolve_child(&current, segment, true)
                .await
                .with_context(|| format!("Failed to look up folder '{segment}'"))?
                .ok_or_else(|| SyncError::FolderNotFound {
                    segment: segment.to_string(),
                    path: remote_path.to_string(),
                })?;
            current = FolderRef::child_of(&current, &entry);
        }
        Ok(current)
    }

    /// Deletes every regular file directly in `local_dir` that is not in
    /// `expected`. Subdirectories are owned by their own tasks and are
    /// left alone.
    async fn reconcile(&self, local_dir: &Path, expected: &HashSet<PathBuf>) -> Result<()> {
        let mut entries = tokio::fs::read_dir(local_dir)
            .await
            .with_context(|| format!("Failed to read local directory {}", local_dir.display()))?;

        let mut orphans: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            let path = entry.path();
            if !expected.contains(&canonical(&path)) {
                orphans.push(path);
            }
        }

        for path in orphans {
            info!(path = %path.display(), "Deleting local file no longer present remotely");
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    self.ctx.record_deleted();
                    self.observer.notify(&SyncEvent::deleted(path));
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to delete local file");
                    self.ctx.record_failure();
                }
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskHandler for TaskRunner {
    async fn handle(&self, task: FolderTask) -> Result<()> {
        self.run_folder(task).await
    }
}

// ============================================================================
// Path helpers
// ============================================================================

/// Splits a drive-relative path into its non-empty segments.
/// Leading/trailing/repeated separators are tolerated.
pub(crate) fn path_segments(raw: &str) -> Vec<&str> {
    raw.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Joins a child name onto a drive-relative parent path.
pub(crate) fn join_remote(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

/// Canonical form of a local path for set membership. Falls back to the
/// input when the path cannot be canonicalized (e.g. it is gone already).
pub(crate) fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
