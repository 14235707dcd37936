//! Writer pool draining the event queue
//!
//! A fixed number of long-lived tasks pop events, hand them to the sink,
//! and requeue whatever fails. A worker finding the queue empty parks for
//! the idle backoff instead of spinning. Failures never terminate a
//! worker; by default an event that keeps failing is retried forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::queue::{EventQueue, Pending};
use crate::store::EventSink;

/// How long an idle worker waits before re-checking an empty queue.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_secs(1);

/// Tuning knobs for the writer pool.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Delay before an idle worker re-checks an empty queue.
    pub idle_backoff: Duration,

    /// Drop an event after this many failed attempts. `None` retries
    /// forever, which is the default: a poison event that always violates
    /// a store constraint will occupy a worker and log indefinitely.
    pub max_attempts: Option<u32>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            max_attempts: None,
        }
    }
}

/// Pool of long-lived writer tasks.
pub struct WriterPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WriterPool {
    /// Start `size` workers draining `queue` into `sink`.
    ///
    /// `size` matches the store's connection pool size, so every worker can
    /// hold a connection during an attempt.
    pub fn start(
        size: usize,
        queue: Arc<EventQueue>,
        sink: Arc<dyn EventSink>,
        options: WriterOptions,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);

        let handles = (0..size)
            .map(|index| {
                let queue = Arc::clone(&queue);
                let sink = Arc::clone(&sink);
                let options = options.clone();
                let stop = shutdown.subscribe();
                tokio::spawn(async move {
                    run_worker(index, queue, sink, options, stop).await;
                })
            })
            .collect();

        Self { handles, shutdown }
    }

    /// Number of workers in the pool.
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Ask every worker to stop after its current attempt and wait for
    /// them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_worker(
    index: usize,
    queue: Arc<EventQueue>,
    sink: Arc<dyn EventSink>,
    options: WriterOptions,
    mut stop: watch::Receiver<bool>,
) {
    debug!(worker = index, "writer started");

    loop {
        if *stop.borrow() {
            break;
        }

        match queue.pop() {
            Some(pending) => attempt(&queue, sink.as_ref(), &options, pending).await,
            None => {
                tokio::select! {
                    _ = queue.wait_for_work(options.idle_backoff) => {}
                    changed = stop.changed() => {
                        // A closed channel means the pool handle is gone.
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    debug!(worker = index, "writer stopped");
}

/// One persistence attempt. A failure sends the event back to the queue
/// tail unless the optional attempt ceiling has been reached.
async fn attempt(
    queue: &EventQueue,
    sink: &dyn EventSink,
    options: &WriterOptions,
    pending: Pending,
) {
    match sink.store(&pending.event).await {
        Ok(()) => {
            debug!(id = %pending.event.id, "event stored");
        }
        Err(e) => {
            let failed_attempts = pending.attempts + 1;
            if let Some(limit) = options.max_attempts {
                if failed_attempts >= limit.max(1) {
                    error!(
                        id = %pending.event.id,
                        attempts = failed_attempts,
                        error = %e,
                        event = ?pending.event,
                        "dropping event after final failed attempt"
                    );
                    return;
                }
            }
            error!(
                id = %pending.event.id,
                attempts = failed_attempts,
                error = %e,
                event = ?pending.event,
                "failed to store event, queueing for retry"
            );
            queue.requeue(pending);
        }
    }
}
