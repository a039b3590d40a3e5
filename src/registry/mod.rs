//! The immutable lookup from request type to handler binding.
//!
//! A `Registry` is built once, before any dispatch, through a
//! [`RegistryBuilder`]. After `build()` it is read-only and shared between the
//! command and query buses behind an `Arc`; concurrent dispatches read it
//! without locking.
//!
//! ## Example
//!
//! ```ignore
//! use routed_rust::{HandlerFn, Registry};
//!
//! let registry = Registry::builder()
//!     .command::<CreateOrder, _>(CreateOrderHandler::new(store.clone()))
//!     .command_with_rollback::<ChargeCard, _>(ChargeCardHandler::new(gateway), false)
//!     .query::<GetOrder, _>(GetOrderHandler::new(store.clone()))
//!     .build()?;
//!
//! let binding = registry.command::<CreateOrder>()?;
//! assert!(binding.requires_transaction());
//! ```

mod builder;
mod error;
mod registry;
mod snapshot;

pub use builder::RegistryBuilder;
pub use error::{RegistryError, SnapshotError};
pub use registry::{CommandBinding, QueryBinding, Registry};
pub use snapshot::{CommandEntry, QueryEntry, RegistrySnapshot};
