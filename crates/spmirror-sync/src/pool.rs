//! Task queue and worker pool
//!
//! A fixed set of workers consumes folder tasks from a shared unbounded
//! queue. Producers are the run controller (top-level tasks) and the
//! workers themselves (discovered subfolders), so the total task count is
//! unknown until the tree has been walked.
//!
//! ## Completion detection
//!
//! A "queue empty" check is not a completion signal: a worker may be
//! mid-listing and about to enqueue more work while the queue is
//! momentarily empty. The queue therefore keeps a pending-task counter,
//! incremented on every enqueue and decremented only after the task has
//! finished. A task enqueues its subtasks before it completes, so the
//! counter can only reach zero once the whole tree has been processed.
//! [`TaskQueue::join`] waits for exactly that (or for a stop request).
//!
//! ## Stopping
//!
//! [`TaskQueue::request_stop`] makes the queue reject new work; workers
//! drain what is already queued and then exit. Nothing interrupts a task
//! that is already inside a download.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use spmirror_core::ports::directory_provider::FolderRef;

use crate::context::RunContext;

// ============================================================================
// FolderTask
// ============================================================================

/// One unit of work: mirror a single remote folder into a local directory.
///
/// Created by the run controller (one per configured folder mapping) and by
/// folder tasks themselves (one per discovered subfolder).
#[derive(Debug, Clone)]
pub struct FolderTask {
    /// Path of the folder within the drive, relative to the drive root.
    pub remote_path: String,
    /// Drive the folder lives on.
    pub drive: FolderRef,
    /// Local directory this folder mirrors into.
    pub local_dir: PathBuf,
}

/// Consumer side of the queue: whatever processes a folder task.
///
/// The worker catches errors at this boundary; a failing task never takes
/// a worker or the pool down.
#[async_trait::async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: FolderTask) -> anyhow::Result<()>;
}

// ============================================================================
// TaskQueue
// ============================================================================

/// State shared between producers, workers and `join`.
struct QueueShared {
    /// Tasks enqueued but not yet completed.
    pending: AtomicUsize,
    /// Signalled when `pending` drops to zero.
    drained: Notify,
    /// Set by `request_stop`; the queue rejects new work once cancelled.
    stop: CancellationToken,
}

/// Cloneable handle for enqueuing tasks and awaiting completion.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<FolderTask>,
    shared: Arc<QueueShared>,
}

impl TaskQueue {
    /// Enqueues a task. After a stop request the task is dropped with a
    /// warning instead.
    pub fn push(&self, task: FolderTask) {
        if self.shared.stop.is_cancelled() {
            warn!(path = %task.remote_path, "Pool is stopping, dropping task");
            return;
        }
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            // Workers are gone; roll the counter back so join can settle.
            self.task_done();
        }
    }

    /// Tells workers to stop accepting new work after draining what is
    /// already queued.
    pub fn request_stop(&self) {
        self.shared.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    /// Number of tasks enqueued but not yet completed.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Blocks until every enqueued task (including ones enqueued along the
    /// way) has completed, or until a stop has been requested.
    pub async fn join(&self) {
        loop {
            let drained = self.shared.drained.notified();
            tokio::pin!(drained);
            // Register for the notification before checking the counter,
            // so the final task_done cannot slip between check and wait.
            drained.as_mut().enable();
            if self.shared.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            tokio::select! {
                _ = &mut drained => {}
                _ = self.shared.stop.cancelled() => return,
            }
        }
    }

    fn task_done(&self) {
        if self.shared.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.drained.notify_waiters();
        }
    }

    fn stop_token(&self) -> CancellationToken {
        self.shared.stop.clone()
    }
}

// ============================================================================
// WorkerPool
// ============================================================================

/// Fixed set of parallel workers over a shared [`TaskQueue`].
pub struct WorkerPool {
    queue: TaskQueue,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<FolderTask>>>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Creates a pool with `worker_count` workers (not yet started).
    pub fn new(worker_count: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = TaskQueue {
            tx,
            shared: Arc::new(QueueShared {
                pending: AtomicUsize::new(0),
                drained: Notify::new(),
                stop: CancellationToken::new(),
            }),
        };
        Self {
            queue,
            rx: Arc::new(Mutex::new(rx)),
            workers: Vec::new(),
            worker_count,
        }
    }

    /// Returns a handle for enqueuing tasks into this pool.
    pub fn queue(&self) -> TaskQueue {
        self.queue.clone()
    }

    /// Launches the workers. Tasks are processed by `handler`; `ctx`
    /// receives activity touches and failure counts.
    pub fn start(&mut self, handler: Arc<dyn TaskHandler>, ctx: Arc<RunContext>) {
        for id in 0..self.worker_count {
            let rx = Arc::clone(&self.rx);
            let queue = self.queue.clone();
            let handler = Arc::clone(&handler);
            let ctx = Arc::clone(&ctx);
            self.workers
                .push(tokio::spawn(worker_loop(id, rx, queue, handler, ctx)));
        }
        debug!(workers = self.worker_count, "Worker pool started");
    }

    /// Waits for all enqueued work to complete (or for a stop request).
    pub async fn join(&self) {
        self.queue.join().await;
    }

    /// Stops the workers and waits for them to exit. Queued tasks are
    /// drained first; an in-flight task finishes normally.
    pub async fn shutdown(&mut self) {
        self.queue.request_stop();
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        debug!("Worker pool shut down");
    }
}

/// A single worker: pull a task, run it, absorb its errors, repeat.
async fn worker_loop(
    id: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<FolderTask>>>,
    queue: TaskQueue,
    handler: Arc<dyn TaskHandler>,
    ctx: Arc<RunContext>,
) {
    let stop = queue.stop_token();
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                task = rx.recv() => task,
                // On stop, drain whatever is still queued before exiting.
                _ = stop.cancelled() => rx.try_recv().ok(),
            }
        };

        let Some(task) = next else { break };

        debug!(worker = id, path = %task.remote_path, "Task started");
        if let Err(err) = handler.handle(task).await {
            warn!(worker = id, error = %format!("{err:#}"), "Task failed");
            ctx.record_failure();
        }
        ctx.touch();
        queue.task_done();
    }
    debug!(worker = id, "Worker stopped");
}

// ============================================================================
// Tests
// ============================================================================
