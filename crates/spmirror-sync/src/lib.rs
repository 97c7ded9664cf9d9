//! spmirror Sync - Directory mirroring engine
//!
//! Mirrors remote document folders into a local filesystem cache on a
//! recurring schedule:
//!
//! - A bounded [`pool::WorkerPool`] fans folder tasks out across workers;
//!   discovered subfolders are re-enqueued rather than recursed into, so
//!   sibling subtrees parallelize and stack depth stays bounded.
//! - Each folder task reconciles its own directory: files observed (or
//!   confirmed up to date) remotely stay, everything else is deleted.
//! - Completion is detected with a pending-task counter; an
//!   [`idle::IdleWatchdog`] stops a run whose activity clock goes quiet.
//! - The [`controller::SyncController`] guarantees at most one active run;
//!   the [`schedule::SyncScheduler`] fires it at a fixed rate from a daily
//!   anchor.
//!
//! ## Modules
//!
//! - [`context`] - Shared per-run state (running flag, activity clock, counters)
//! - [`pool`] - Task queue and worker pool
//! - [`idle`] - Idle-timeout watchdog
//! - [`folder`] - Folder task: resolution, listing, fan-out, reconciliation
//! - [`file`] - File sync: staleness check, download with retry, mtime stamping
//! - [`controller`] - Run orchestration
//! - [`schedule`] - Fixed-rate scheduling from a daily anchor

pub mod context;
pub mod controller;
pub mod file;
pub mod folder;
pub mod idle;
pub mod pool;
pub mod schedule;

use thiserror::Error;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote path segment could not be resolved to a folder
    #[error("Remote folder segment '{segment}' not found under '{path}'")]
    FolderNotFound {
        /// The segment that failed to resolve
        segment: String,
        /// The full remote path being resolved
        path: String,
    },

    /// A file download kept failing until the attempt budget ran out
    #[error("Download of '{name}' failed after {attempts} attempts")]
    DownloadExhausted {
        /// Name of the file
        name: String,
        /// Number of attempts made
        attempts: u32,
    },
}
