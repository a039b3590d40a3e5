//! Deferred execution: the envelope handed to a queue runtime, the runtime
//! contract itself, and an in-process runtime with a polling worker.
//!
//! ## Architecture
//!
//! ```text
//! CommandBus::dispatch ──► DeferredCommand ──► QueueRuntime::submit ──► JobId
//!                                                     │
//!                                     InMemoryJobQueue (named FIFO queues)
//!                                                     │
//!                                 JobWorker / run_pending ──► execute()
//! ```
//!
//! Out-of-process runtimes persist a [`JobRecord`] (bitcode-encoded) and turn
//! it back into an envelope with `CommandBus::rehydrate` at execution time.

mod envelope;
mod in_memory;
mod runtime;
mod worker;

pub use envelope::{DeferredCommand, JobRecord};
pub use in_memory::{
    InMemoryJobQueue, QueuedJob, Submission, MAX_DELAY_SECONDS, SUBMISSION_LOG_LIMIT,
};
pub use runtime::{JobId, QueueRuntime, SubmitError};
pub use worker::{run_pending, JobWorker, WorkerStats};
