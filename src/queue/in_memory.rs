//! In-process queue runtime for tests and single-process services.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::envelope::DeferredCommand;
use super::runtime::{JobId, QueueRuntime, SubmitError};

/// A job waiting in (or reserved from) a queue.
pub struct QueuedJob {
    pub id: JobId,
    pub queue: String,
    /// The job is not handed out before this instant.
    pub available_at: Instant,
    pub envelope: DeferredCommand,
}

impl fmt::Debug for QueuedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedJob")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .field("command", &self.envelope.name())
            .finish()
    }
}

/// The arguments of one `submit` call, as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: JobId,
    pub command: &'static str,
    pub queue: Option<String>,
    pub delay_seconds: Option<u64>,
}

/// Longest hold-back honored by the in-memory queue (100 years). Larger
/// delays are clamped to it.
pub const MAX_DELAY_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Most recent submissions kept for inspection.
pub const SUBMISSION_LOG_LIMIT: usize = 1024;

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<QueuedJob>>,
    submissions: VecDeque<Submission>,
    next_id: u64,
    closed: bool,
}

/// Named FIFO queues held in memory.
///
/// - Submissions without a queue name go to the default queue
/// - `delay_seconds` holds a job back until it becomes available
/// - The most recent [`SUBMISSION_LOG_LIMIT`] `submit` calls are recorded
///   verbatim in `submissions()`; `take_submissions()` drains the log
/// - Clones share the same queues
///
/// ## Example
///
/// ```ignore
/// let queue = InMemoryJobQueue::new("default");
/// let bus = CommandBus::new(registry, pipeline, Arc::new(NoTransaction), Arc::new(queue.clone()));
///
/// bus.dispatch(SendReceipt { order_id: "o-1".into() })?;
/// let stats = run_pending(&queue, "mail", false)?;
/// assert_eq!(stats.executed, 1);
/// ```
#[derive(Clone)]
pub struct InMemoryJobQueue {
    default_queue: Arc<str>,
    state: Arc<Mutex<State>>,
    ready: Arc<Condvar>,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new("default")
    }
}

impl InMemoryJobQueue {
    pub fn new(default_queue: impl Into<String>) -> Self {
        Self {
            default_queue: Arc::from(default_queue.into()),
            state: Arc::new(Mutex::new(State::default())),
            ready: Arc::new(Condvar::new()),
        }
    }

    pub fn default_queue(&self) -> &str {
        &self.default_queue
    }

    /// Take the oldest available job from `queue`, if any.
    pub fn reserve(&self, queue: &str) -> Result<Option<QueuedJob>, SubmitError> {
        let mut state = self.lock("reserve")?;
        Ok(take_available(&mut state, queue, Instant::now()))
    }

    /// Like `reserve`, but wait up to `timeout` for a job to become available.
    pub fn reserve_timeout(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<QueuedJob>, SubmitError> {
        // A timeout past the clock's range waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock("reserve")?;

        loop {
            let now = Instant::now();
            if let Some(job) = take_available(&mut state, queue, now) {
                return Ok(Some(job));
            }
            if deadline.is_some_and(|deadline| now >= deadline) {
                return Ok(None);
            }

            // Wake early when a delayed job in this queue comes due.
            let due = state
                .queues
                .get(queue)
                .and_then(|jobs| jobs.iter().map(|job| job.available_at).min());
            let wake_at = match (due, deadline) {
                (Some(due), Some(deadline)) => Some(due.min(deadline)),
                (due, deadline) => due.or(deadline),
            };

            state = match wake_at {
                Some(wake_at) => {
                    self.ready
                        .wait_timeout(state, wake_at.saturating_duration_since(now))
                        .map_err(|_| SubmitError::LockPoisoned("reserve"))?
                        .0
                }
                None => self
                    .ready
                    .wait(state)
                    .map_err(|_| SubmitError::LockPoisoned("reserve"))?,
            };
        }
    }

    /// Jobs waiting in `queue`, including delayed ones.
    pub fn len(&self, queue: &str) -> usize {
        self.lock("len")
            .map(|state| state.queues.get(queue).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Whether every queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock("is_empty")
            .map(|state| state.queues.values().all(VecDeque::is_empty))
            .unwrap_or(true)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock("submissions")
            .map(|state| state.submissions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drain the submission log.
    pub fn take_submissions(&self) -> Vec<Submission> {
        self.lock("take_submissions")
            .map(|mut state| state.submissions.drain(..).collect())
            .unwrap_or_default()
    }

    /// Stop accepting submissions. Queued jobs can still be reserved.
    pub fn close(&self) {
        if let Ok(mut state) = self.lock("close") {
            state.closed = true;
        }
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock("is_closed").map(|state| state.closed).unwrap_or(true)
    }

    fn lock(&self, op: &'static str) -> Result<MutexGuard<'_, State>, SubmitError> {
        self.state.lock().map_err(|_| SubmitError::LockPoisoned(op))
    }
}

/// Delays are capped at [`MAX_DELAY_SECONDS`]; a due time the clock cannot
/// represent is rejected.
fn due_at(now: Instant, delay_seconds: u64) -> Result<Instant, SubmitError> {
    now.checked_add(Duration::from_secs(delay_seconds.min(MAX_DELAY_SECONDS)))
        .ok_or_else(|| SubmitError::Rejected(format!("delay of {}s out of range", delay_seconds)))
}

fn take_available(state: &mut State, queue: &str, now: Instant) -> Option<QueuedJob> {
    let jobs = state.queues.get_mut(queue)?;
    let index = jobs.iter().position(|job| job.available_at <= now)?;
    jobs.remove(index)
}

impl QueueRuntime for InMemoryJobQueue {
    fn submit(
        &self,
        envelope: DeferredCommand,
        queue: Option<&str>,
        delay_seconds: Option<u64>,
    ) -> Result<JobId, SubmitError> {
        let queue_name = queue.unwrap_or(&*self.default_queue).to_string();
        let mut state = self.lock("submit")?;
        if state.closed {
            return Err(SubmitError::Closed(queue_name));
        }

        let available_at = due_at(Instant::now(), delay_seconds.unwrap_or(0))?;
        state.next_id += 1;
        let id = JobId::new(format!("{}-{}", queue_name, state.next_id));

        if state.submissions.len() == SUBMISSION_LOG_LIMIT {
            state.submissions.pop_front();
        }
        state.submissions.push_back(Submission {
            id: id.clone(),
            command: envelope.name(),
            queue: queue.map(str::to_string),
            delay_seconds,
        });
        state
            .queues
            .entry(queue_name.clone())
            .or_default()
            .push_back(QueuedJob {
                id: id.clone(),
                queue: queue_name,
                available_at,
                envelope,
            });
        drop(state);

        self.ready.notify_all();
        Ok(id)
    }
}
