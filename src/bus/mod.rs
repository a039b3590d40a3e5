//! Dispatch cores - the command and query buses.
//!
//! ## Architecture
//!
//! ```text
//! dispatch(command)
//!     │
//!     ├─ async annotation (cached per type) or explicit_async?
//!     │      yes ──► DeferredCommand ──► QueueRuntime::submit ──► Dispatched::Queued
//!     │
//!     └─ no ──► MiddlewarePipeline ──► [TransactionManager] ──► handler
//!                     │
//!                     └─ on Err: RollbackHandler::rollback(command), error returned as-is
//!
//! ask(query) ──► MiddlewarePipeline ──► handler
//! ```

mod bus;
mod command_bus;
mod query_bus;

pub use bus::{Bus, BusBuilder};
pub use command_bus::{CommandBus, Dispatched};
pub use query_bus::QueryBus;
