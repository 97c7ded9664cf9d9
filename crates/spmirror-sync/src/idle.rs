//! Idle-timeout watchdog
//!
//! Completion of a run is detected exactly by the pool's pending-task
//! counter; the watchdog is the failsafe behind it. If a provider call
//! wedges and the shared activity clock goes quiet for longer than the
//! threshold, the watchdog asks the pool to stop so the run can finish
//! instead of hanging forever.
//!
//! The watchdog starts polling after an initial delay, checks the time
//! since the last recorded activity on each poll, and deactivates itself
//! once it has fired.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::pool::TaskQueue;

/// Watches the run's activity clock and stops the pool when it goes quiet.
pub struct IdleWatchdog {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl IdleWatchdog {
    /// Spawns the watchdog.
    ///
    /// # Arguments
    /// * `ctx` - Run context carrying the activity clock
    /// * `queue` - Queue to stop when the run goes idle
    /// * `initial_delay` - Grace period before the first poll
    /// * `poll` - Interval between polls
    /// * `threshold` - Inactivity span that counts as idle
    pub fn spawn(
        ctx: Arc<RunContext>,
        queue: TaskQueue,
        initial_delay: Duration,
        poll: Duration,
        threshold: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(initial_delay) => {}
                _ = token.cancelled() => return,
            }

            loop {
                let idle = ctx.idle_for();
                if idle >= threshold {
                    warn!(
                        idle_secs = idle.as_secs(),
                        "No sync activity beyond the idle threshold, stopping the worker pool"
                    );
                    queue.request_stop();
                    return;
                }
                debug!(idle_ms = idle.as_millis() as u64, "Idle watchdog poll");

                tokio::select! {
                    _ = tokio::time::sleep(poll) => {}
                    _ = token.cancelled() => return,
                }
            }
        });

        Self { handle, cancel }
    }

    /// Deactivates the watchdog and waits for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}
