//! Command/query dispatch for plain Rust structs.
//!
//! A [`Registry`] maps each command and query type to exactly one handler.
//! The [`CommandBus`] runs commands through a [`MiddlewarePipeline`],
//! optionally inside a transaction, calls the handler's rollback when a
//! dispatch fails, and hands async-annotated commands to a [`QueueRuntime`].
//! The [`QueryBus`] runs queries through the same pipeline, synchronously.

// Lets derive output (`routed_rust::Command`) resolve inside this crate too.
extern crate self as routed_rust;

mod bus;
mod config;
mod error;
mod handler;
mod message;
mod middleware;
mod queue;
mod registry;
mod transaction;

pub use bus::{Bus, BusBuilder, CommandBus, Dispatched, QueryBus};
pub use config::{BusConfig, CommandConfig, ConfigError, LoggingConfig, WorkerConfig};
pub use error::{DispatchError, HandlerError};
pub use handler::{CommandHandler, HandlerFn, QueryHandler, RollbackHandler};
pub use message::{AsyncCommand, Command, Payload, Query, Request, RequestKind};
pub use middleware::{Continuation, LoggingMiddleware, Middleware, MiddlewarePipeline, Next};
pub use queue::{
    run_pending, DeferredCommand, InMemoryJobQueue, JobId, JobRecord, JobWorker, QueueRuntime,
    QueuedJob, Submission, SubmitError, WorkerStats, MAX_DELAY_SECONDS, SUBMISSION_LOG_LIMIT,
};
pub use registry::{
    CommandBinding, CommandEntry, QueryBinding, QueryEntry, Registry, RegistryBuilder,
    RegistryError, RegistrySnapshot, SnapshotError,
};
pub use transaction::{
    InMemoryStore, NoTransaction, StoreError, TransactionError, TransactionManager, Work,
};

// Derive macros share their trait's name, like serde's.
pub use routed_rust_macros::{Command, Query};
