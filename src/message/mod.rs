//! The typed requests routed by the buses.
//!
//! A request is either a `Command` (mutates state, may run inside a
//! transaction, may be deferred to a queue) or a `Query` (reads state, always
//! synchronous). Routing identity is the concrete Rust type.
//!
//! ## Example
//!
//! ```ignore
//! use routed_rust::{Command, Query};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Command)]
//! #[command(name = "order.create")]
//! pub struct CreateOrder {
//!     pub id: String,
//! }
//!
//! #[derive(Serialize, Deserialize, Command)]
//! #[command(name = "email.send", queue = "mail", delay_seconds = 30)]
//! pub struct SendReceipt {
//!     pub order_id: String,
//! }
//!
//! #[derive(Serialize, Query)]
//! #[query(name = "order.get")]
//! pub struct GetOrder {
//!     pub id: String,
//! }
//! ```

mod request;

pub use request::{Payload, Request};

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Which side of the bus a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Command,
    Query,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Command => write!(f, "command"),
            RequestKind::Query => write!(f, "query"),
        }
    }
}

/// Scheduling hints that mark a command type as inherently asynchronous.
///
/// `queue` and `delay_seconds` are forwarded verbatim to the queue runtime;
/// `None` leaves the choice to the runtime (its default queue, no delay).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncCommand {
    pub queue: Option<String>,
    pub delay_seconds: Option<u64>,
}

impl AsyncCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route the command to a named queue.
    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Hold the job back for `seconds` before it becomes available.
    pub fn delayed_by(mut self, seconds: u64) -> Self {
        self.delay_seconds = Some(seconds);
        self
    }
}

/// A mutating request routed to exactly one command handler.
///
/// Commands must round-trip through serde so they can be carried in a
/// [`JobRecord`](crate::JobRecord) and executed out of process.
pub trait Command: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name used for logging, config overrides and job records.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Async annotation for this command type. `Some` means every instance is
    /// dispatched through the queue runtime.
    fn async_options() -> Option<AsyncCommand> {
        None
    }
}

/// A read-only request routed to exactly one query handler.
pub trait Query: Serialize + Send + Sync + 'static {
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
