//! Shared per-run state
//!
//! [`RunContext`] is the one piece of state shared between the run
//! controller, the worker pool, the idle watchdog and every task: the
//! exclusive running flag, the last-activity clock, and the event counters
//! backing the run summary. It is passed explicitly to everything that
//! needs it; there are no module-level globals.
//!
//! The activity clock is monotonic (milliseconds since context creation),
//! so wall-clock adjustments cannot confuse the idle watchdog.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide run state, one instance per engine.
#[derive(Debug)]
pub struct RunContext {
    /// Exclusive flag: at most one run is active at any time.
    is_running: AtomicBool,
    /// Base instant for the monotonic activity clock.
    epoch: Instant,
    /// Milliseconds since `epoch` of the most recent task activity.
    last_activity_ms: AtomicU64,
    /// Files downloaded for the first time this run.
    files_downloaded: AtomicU32,
    /// Existing files replaced by newer remote copies this run.
    files_updated: AtomicU32,
    /// Local files deleted this run.
    files_deleted: AtomicU32,
    /// Non-fatal task failures this run.
    failures: AtomicU32,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            is_running: AtomicBool::new(false),
            epoch: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            files_downloaded: AtomicU32::new(0),
            files_updated: AtomicU32::new(0),
            files_deleted: AtomicU32::new(0),
            failures: AtomicU32::new(0),
        }
    }

    // ------------------------------------------------------------------
    // Running flag
    // ------------------------------------------------------------------

    /// Attempts to claim the running flag. Returns `false` when another
    /// run is already active.
    pub fn try_begin_run(&self) -> bool {
        self.is_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Releases the running flag.
    pub fn end_run(&self) {
        self.is_running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Activity clock
    // ------------------------------------------------------------------

    /// Records activity "now". Every task calls this around each remote
    /// call attempt, success or failure, so the clock reflects liveness.
    pub fn touch(&self) {
        let ms = self.epoch.elapsed().as_millis() as u64;
        self.last_activity_ms.store(ms, Ordering::Release);
    }

    /// Time elapsed since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        let last_ms = self.last_activity_ms.load(Ordering::Acquire);
        Duration::from_millis(now_ms.saturating_sub(last_ms))
    }

    // ------------------------------------------------------------------
    // Per-run counters
    // ------------------------------------------------------------------

    /// Resets counters and the activity clock at the start of a run.
    pub fn reset_for_run(&self) {
        self.files_downloaded.store(0, Ordering::Release);
        self.files_updated.store(0, Ordering::Release);
        self.files_deleted.store(0, Ordering::Release);
        self.failures.store(0, Ordering::Release);
        self.touch();
    }

    pub fn record_downloaded(&self) {
        self.files_downloaded.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_updated(&self) {
        self.files_updated.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::AcqRel);
    }

    pub fn files_downloaded(&self) -> u32 {
        self.files_downloaded.load(Ordering::Acquire)
    }

    pub fn files_updated(&self) -> u32 {
        self.files_updated.load(Ordering::Acquire)
    }

    pub fn files_deleted(&self) -> u32 {
        self.files_deleted.load(Ordering::Acquire)
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Acquire)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
