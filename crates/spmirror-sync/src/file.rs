//! File sync execution
//!
//! Second impl block of [`TaskRunner`]: syncing a single remote file into
//! its target directory.
//!
//! A file is downloaded only when it is stale: if a local copy exists and
//! its modification time is at or after the remote timestamp, the file is
//! treated as already synchronized. After a successful download the local
//! file is stamped with the remote modification time so future comparisons
//! stay correct. Comparison happens at whole-second precision; filesystems
//! that truncate sub-second timestamps must not cause re-downloads.
//!
//! Writes are atomic (temp file + rename), so readers of the cache never
//! observe a partially written file.
//!
//! Transient faults are retried up to the policy's attempt budget with a
//! fixed delay; exhaustion or a non-transient error is returned to the
//! folder task, which logs it and moves on; a file failure is never fatal
//! to the folder or the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use filetime::FileTime;
use tracing::{debug, info, warn};

use spmirror_core::ports::directory_provider::RemoteEntry;
use spmirror_core::ports::notification::SyncEvent;

use crate::folder::TaskRunner;
use crate::SyncError;

impl TaskRunner {
    /// Syncs one remote file into `local_dir`, returning the local path
    /// once the file is confirmed present and current.
    pub(crate) async fn sync_file(&self, entry: &RemoteEntry, local_dir: &Path) -> Result<PathBuf> {
        let target = local_dir.join(&entry.name);

        let existing = tokio::fs::metadata(&target).await.ok();
        if let (Some(meta), Some(remote_modified)) = (existing.as_ref(), entry.last_modified) {
            if let Ok(local_modified) = meta.modified() {
                let local: DateTime<Utc> = local_modified.into();
                if local.timestamp() >= remote_modified.timestamp() {
                    debug!(path = %target.display(), "Local copy up to date, skipping download");
                    return Ok(target);
                }
            }
        }

        let data = self.download_with_retry(entry).await?;

        let existed = existing.is_some();
        write_atomic(&target, &data).await?;

        if let Some(remote_modified) = entry.last_modified {
            let mtime = FileTime::from_system_time(remote_modified.into());
            if let Err(err) = filetime::set_file_mtime(&target, mtime) {
                warn!(
                    path = %target.display(),
                    error = %err,
                    "Failed to stamp remote modification time"
                );
            }
        }

        if existed {
            info!(path = %target.display(), bytes = data.len(), "Updated file from remote");
            self.context().record_updated();
            self.observer().notify(&SyncEvent::updated(target.clone()));
        } else {
            info!(path = %target.display(), bytes = data.len(), "Downloaded new file");
            self.context().record_downloaded();
            self.observer().notify(&SyncEvent::created(target.clone()));
        }

        Ok(target)
    }

    /// Downloads with the fixed retry policy. Every attempt, success or
    /// failure, refreshes the activity clock.
    async fn download_with_retry(&self, entry: &RemoteEntry) -> Result<Vec<u8>> {
        let policy = self.retry();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.context().touch();

            match self.provider().download(entry).await {
                Ok(data) => {
                    self.context().touch();
                    if attempt > 1 {
                        info!(file = %entry.name, attempt, "Download succeeded after retry");
                    }
                    return Ok(data);
                }
                Err(err) => {
                    self.context().touch();
                    let transient = is_transient_error(&err);
                    if transient && attempt < policy.attempts {
                        warn!(
                            file = %entry.name,
                            attempt,
                            delay_ms = policy.delay.as_millis() as u64,
                            error = %format!("{err:#}"),
                            "Transient download fault, retrying"
                        );
                        tokio::time::sleep(policy.delay).await;
                        continue;
                    }
                    if transient {
                        return Err(err.context(SyncError::DownloadExhausted {
                            name: entry.name.clone(),
                            attempts: attempt,
                        }));
                    }
                    return Err(err.context(format!("Download of '{}' failed", entry.name)));
                }
            }
        }
    }
}

/// Determines whether an error is transient (retryable).
///
/// Transient errors are connection-level faults and throttling/server
/// responses that survived the provider's own retry. Errors at port
/// boundaries are `anyhow`, so classification inspects the rendered chain.
pub(crate) fn is_transient_error(err: &anyhow::Error) -> bool {
    let err_str = format!("{err:#}").to_lowercase();

    // Connection-level faults
    if err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("dns")
        || err_str.contains("reset by peer")
        || err_str.contains("broken pipe")
    {
        return true;
    }

    // Throttling that survived the provider's single retry
    if err_str.contains("429")
        || err_str.contains("too many requests")
        || err_str.contains("rate limit")
    {
        return true;
    }

    // Server errors (5xx)
    if err_str.contains("500")
        || err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("504")
        || err_str.contains("server error")
    {
        return true;
    }

    false
}

/// Writes `data` to `target` atomically: write to a temp file in the same
/// directory, then rename over the target.
async fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    tokio::fs::write(&tmp_path, data)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;

    if let Err(err) = tokio::fs::rename(&tmp_path, target).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err)
            .with_context(|| format!("Failed to move temp file into {}", target.display()));
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
