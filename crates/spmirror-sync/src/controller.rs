//! Run orchestration
//!
//! [`SyncController::run`] executes one complete mirror pass:
//!
//! 1. Claim the exclusive running flag (a second `run()` while one is
//!    active is a logged no-op).
//! 2. Establish the provider session; an authentication failure here is
//!    the only error a caller of `run()` ever sees.
//! 3. Start the worker pool and the idle watchdog, then enqueue one
//!    top-level folder task per configured folder mapping. A mapping whose
//!    drive cannot be resolved is logged and skipped; the rest of the run
//!    proceeds.
//! 4. Wait for the pending-task counter to drain, stop the watchdog and
//!    the workers.
//! 5. Report now-empty directories under each cache root (report only;
//!    nothing is deleted).
//! 6. Release the flag and log the elapsed time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

use spmirror_core::config::Config;
use spmirror_core::ports::directory_provider::IDirectoryProvider;
use spmirror_core::ports::notification::ISyncObserver;

use crate::context::RunContext;
use crate::folder::{RetryPolicy, TaskRunner};
use crate::idle::IdleWatchdog;
use crate::pool::{FolderTask, TaskHandler, WorkerPool};

/// Summary of a completed mirror run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Files downloaded for the first time.
    pub files_downloaded: u32,
    /// Existing files replaced by newer remote copies.
    pub files_updated: u32,
    /// Local files deleted as orphans.
    pub files_deleted: u32,
    /// Non-fatal failures (folder aborts, exhausted downloads).
    pub failures: u32,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

/// Orchestrates mirror runs; guarantees at most one is active at a time.
pub struct SyncController {
    config: Arc<Config>,
    provider: Arc<dyn IDirectoryProvider>,
    observer: Arc<dyn ISyncObserver>,
    ctx: Arc<RunContext>,
}

impl SyncController {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn IDirectoryProvider>,
        observer: Arc<dyn ISyncObserver>,
    ) -> Self {
        Self {
            config,
            provider,
            observer,
            ctx: Arc::new(RunContext::new()),
        }
    }

    /// Shared run state, exposed for diagnostics and tests.
    pub fn context(&self) -> &Arc<RunContext> {
        &self.ctx
    }

    /// Executes one mirror run.
    ///
    /// Returns `Ok(None)` when another run is already active.
    ///
    /// # Errors
    /// Only session establishment (authentication) failures are returned;
    /// everything after the pool starts is absorbed, counted and logged.
    pub async fn run(&self) -> Result<Option<RunSummary>> {
        if !self.ctx.try_begin_run() {
            info!("A sync run is already active, skipping this trigger");
            return Ok(None);
        }

        let started = Instant::now();
        self.ctx.reset_for_run();
        info!("Sync run starting");

        if let Err(err) = self.provider.ensure_session().await {
            self.ctx.end_run();
            return Err(err.context("Session establishment failed, aborting run"));
        }

        let engine = &self.config.engine;
        let mut pool = WorkerPool::new(engine.workers.max(1));
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.observer),
            Arc::clone(&self.ctx),
            pool.queue(),
            RetryPolicy::from(engine),
        ));
        pool.start(runner as Arc<dyn TaskHandler>, Arc::clone(&self.ctx));

        let watchdog = IdleWatchdog::spawn(
            Arc::clone(&self.ctx),
            pool.queue(),
            Duration::from_secs(engine.idle_initial_delay_secs),
            Duration::from_secs(engine.idle_poll_secs),
            Duration::from_secs(engine.idle_threshold_secs),
        );

        self.enqueue_mappings(&pool).await;

        pool.join().await;
        watchdog.stop().await;
        pool.shutdown().await;

        for site in &self.config.sites {
            report_empty_directories(&site.local_cache).await;
        }

        let summary = RunSummary {
            files_downloaded: self.ctx.files_downloaded(),
            files_updated: self.ctx.files_updated(),
            files_deleted: self.ctx.files_deleted(),
            failures: self.ctx.failures(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.ctx.end_run();

        info!(
            downloaded = summary.files_downloaded,
            updated = summary.files_updated,
            deleted = summary.files_deleted,
            failures = summary.failures,
            duration_ms = summary.duration_ms,
            "Sync run completed"
        );

        Ok(Some(summary))
    }

    /// Resolves each folder mapping's drive and enqueues its top-level
    /// task. Resolution failure skips only that mapping.
    async fn enqueue_mappings(&self, pool: &WorkerPool) {
        for site in &self.config.sites {
            for mapping in &site.folders {
                match self.provider.resolve_drive(&site.site, &mapping.drive).await {
                    Ok(drive) => {
                        pool.queue().push(FolderTask {
                            remote_path: mapping.path.clone(),
                            drive,
                            local_dir: site.local_cache.clone(),
                        });
                    }
                    Err(err) => {
                        warn!(
                            site = %site.site,
                            drive = %mapping.drive,
                            error = %format!("{err:#}"),
                            "Skipping folder mapping, drive resolution failed"
                        );
                        self.ctx.record_failure();
                    }
                }
                self.ctx.touch();
            }
        }
    }
}

/// Walks `root` and reports directories that ended up empty after the run.
/// Whether to remove them is left to the operator; the engine only reports.
async fn report_empty_directories(root: &Path) {
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        let mut child_count = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            child_count += 1;
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                stack.push(entry.path());
            }
        }

        if child_count == 0 && dir != root {
            info!(path = %dir.display(), "Local directory is empty after sync");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_directory_report_tolerates_missing_root() {
        report_empty_directories(Path::new("/nonexistent/cache/root")).await;
    }

    #[tokio::test]
    async fn empty_directory_report_walks_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/file.txt"), b"x").unwrap();
        // Just exercises the walk; the report itself goes to the log.
        report_empty_directories(dir.path()).await;
    }
}
