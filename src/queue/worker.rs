//! Background worker draining one queue of an [`InMemoryJobQueue`].

use std::any::Any;
use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use super::in_memory::{InMemoryJobQueue, QueuedJob};
use super::runtime::SubmitError;
use crate::config::WorkerConfig;

/// Counters collected by a worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    /// Jobs whose handler returned `Ok`.
    pub executed: usize,
    /// Jobs whose handler returned `Err`. Failed jobs are not retried.
    pub failed: usize,
    pub polls: usize,
}

/// A background thread that reserves jobs from a named queue and executes
/// them, one at a time.
///
/// ## Example
///
/// ```ignore
/// let worker = JobWorker::spawn(queue.clone(), "mail", &config.worker);
///
/// // ... dispatch deferred commands ...
///
/// let stats = worker.stop();
/// println!("executed {} jobs", stats.executed);
/// ```
pub struct JobWorker {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl JobWorker {
    pub fn spawn(
        queue: InMemoryJobQueue,
        queue_name: impl Into<String>,
        config: &WorkerConfig,
    ) -> Self {
        let queue_name = queue_name.into();
        let poll_interval = config.poll_interval();
        let reapply = config.reapply_middleware;
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = WorkerStats::default();

            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }

                stats.polls += 1;

                match queue.reserve_timeout(&queue_name, poll_interval) {
                    Ok(Some(job)) => run_job(job, reapply, &mut stats),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(queue = %queue_name, error = %e, "worker stopped");
                        break;
                    }
                }
            }

            stats
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the worker to stop and wait for it to finish.
    pub fn stop(mut self) -> WorkerStats {
        let _ = self.stop_tx.send(());
        let Some(handle) = self.handle.take() else {
            return WorkerStats::default();
        };
        handle.join().unwrap_or_else(|panic| {
            tracing::error!(
                reason = panic_message(panic.as_ref()),
                "worker thread panicked, stats lost"
            );
            WorkerStats::default()
        })
    }

    /// Signal the worker to stop without waiting.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for JobWorker {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

/// Execute every job currently available on `queue_name`, on the calling
/// thread. Delayed jobs that are not yet due stay queued.
pub fn run_pending(
    queue: &InMemoryJobQueue,
    queue_name: &str,
    reapply_middleware: bool,
) -> Result<WorkerStats, SubmitError> {
    let mut stats = WorkerStats::default();
    while let Some(job) = queue.reserve(queue_name)? {
        stats.polls += 1;
        run_job(job, reapply_middleware, &mut stats);
    }
    Ok(stats)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown")
}

fn run_job(job: QueuedJob, reapply_middleware: bool, stats: &mut WorkerStats) {
    let QueuedJob {
        id, queue, envelope, ..
    } = job;
    let command = envelope.name();

    let result = if reapply_middleware {
        envelope.execute_with_middleware()
    } else {
        envelope.execute()
    };

    match result {
        Ok(_) => {
            tracing::debug!(job = %id, %queue, command, "job executed");
            stats.executed += 1;
        }
        Err(e) => {
            tracing::error!(job = %id, %queue, command, error = %e, "job failed");
            stats.failed += 1;
        }
    }
}
