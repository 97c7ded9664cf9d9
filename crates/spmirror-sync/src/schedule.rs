//! Fixed-rate scheduling from a daily anchor
//!
//! The schedule is configured with a daily start time (`"HH"` or
//! `"HH:MM"`) and a fixed interval (`"<integer><d|h|m>"`). The first
//! trigger is the anchor advanced by whole intervals until it is at or
//! after "now"; subsequent triggers fire at `anchor + k * interval`
//! regardless of how long a run takes (fixed-rate, not fixed-delay).
//!
//! A trigger that lands while a run is still active is rejected by the
//! controller's guard; ticks are never queued or coalesced into a
//! catch-up burst. Cancelling the scheduler stops future triggers only;
//! an in-flight run is unaffected.
//!
//! Any missing or unparseable schedule field disables scheduling
//! entirely ([`ScheduleSpec::parse`] returns `None`).

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use spmirror_core::config::ScheduleConfig;

use crate::controller::SyncController;

/// Upper bound on the configured interval; anything longer is treated as
/// a configuration mistake.
const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

// ============================================================================
// ScheduleSpec
// ============================================================================

/// A parsed, valid schedule: daily anchor time plus fixed-rate interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSpec {
    /// Time of day the anchor falls on.
    start: NaiveTime,
    /// Fixed-rate period.
    interval: Duration,
}

impl ScheduleSpec {
    /// Parses the schedule section. Returns `None` (scheduling disabled)
    /// when either field is absent or invalid.
    pub fn parse(config: &ScheduleConfig) -> Option<Self> {
        let start_time = match config.start_time.as_deref() {
            Some(s) => s,
            None => {
                info!("No sync start time configured, scheduling disabled");
                return None;
            }
        };
        let interval = match config.interval.as_deref() {
            Some(s) => s,
            None => {
                info!("No sync interval configured, scheduling disabled");
                return None;
            }
        };

        let start = match parse_start_time(start_time) {
            Some(t) => t,
            None => {
                warn!(start_time, "Unparseable sync start time, scheduling disabled");
                return None;
            }
        };
        let interval_duration = match parse_interval(interval) {
            Some(d) => d,
            None => {
                warn!(interval, "Unparseable sync interval, scheduling disabled");
                return None;
            }
        };

        Some(Self {
            start,
            interval: interval_duration,
        })
    }

    /// The fixed-rate period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Computes the first trigger: today's anchor advanced by whole
    /// intervals until it is at or after `now`.
    pub fn first_trigger(&self, now: NaiveDateTime) -> NaiveDateTime {
        let mut anchor = now.date().and_time(self.start);
        let step = chrono::Duration::from_std(self.interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(MAX_INTERVAL_SECS as i64));
        while anchor < now {
            anchor += step;
        }
        anchor
    }
}

/// Parses `"HH"` or `"HH:MM"` into a time of day.
fn parse_start_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    let (hour_str, minute_str) = match raw.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (raw, None),
    };

    let hour: u32 = hour_str.trim().parse().ok()?;
    let minute: u32 = match minute_str {
        Some(m) => m.trim().parse().ok()?,
        None => 0,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parses `"<integer><d|h|m>"` (case-insensitive) into a duration.
fn parse_interval(raw: &str) -> Option<Duration> {
    let raw = raw.trim().to_lowercase();
    let (number, unit_secs) = if let Some(n) = raw.strip_suffix('d') {
        (n, 24 * 60 * 60)
    } else if let Some(n) = raw.strip_suffix('h') {
        (n, 60 * 60)
    } else if let Some(n) = raw.strip_suffix('m') {
        (n, 60)
    } else {
        return None;
    };

    let count: u64 = number.trim().parse().ok()?;
    let secs = count.checked_mul(unit_secs)?;
    if secs == 0 || secs > MAX_INTERVAL_SECS {
        return None;
    }
    Some(Duration::from_secs(secs))
}

// ============================================================================
// SyncScheduler
// ============================================================================

/// Arms and cancels the fixed-rate trigger driving the controller.
pub struct SyncScheduler {
    handle: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Whether the scheduler currently has a trigger armed.
    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Arms the fixed-rate trigger. Calling `start` while already armed
    /// is a no-op.
    pub fn start(&mut self, spec: ScheduleSpec, controller: Arc<SyncController>) {
        if self.handle.is_some() {
            info!("Scheduler already armed, ignoring start request");
            return;
        }

        let now = Local::now().naive_local();
        let first = spec.first_trigger(now);
        let delay = (first - now).to_std().unwrap_or_default();
        info!(
            first_trigger = %first,
            interval_secs = spec.interval().as_secs(),
            "Scheduler armed"
        );

        let handle = tokio::spawn(async move {
            let start_at = tokio::time::Instant::now() + delay;
            let mut ticker = tokio::time::interval_at(start_at, spec.interval());
            // Ticks must never queue up behind a long run; a skipped tick
            // simply waits for the next aligned trigger time.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                info!("Scheduled sync trigger fired");

                // The run is spawned rather than awaited so trigger times
                // stay aligned to the anchor; overlap is rejected by the
                // controller's guard.
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    match controller.run().await {
                        Ok(Some(_)) | Ok(None) => {}
                        Err(err) => {
                            error!(error = %format!("{err:#}"), "Scheduled sync run failed");
                        }
                    }
                });
            }
        });

        self.handle = Some(handle);
    }

    /// Stops future triggers. An in-flight run is unaffected.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Scheduler cancelled");
        }
    }
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
