//! Handler contracts and the type-erased adapters the registry stores.
//!
//! Handlers are plain structs (or closures via [`HandlerFn`]) implementing
//! `CommandHandler<C>` / `QueryHandler<Q>`. A command handler may also
//! implement `RollbackHandler<C>`; register it with
//! `RegistryBuilder::command_with_rollback` and the bus will call `rollback`
//! with the original command whenever a synchronous dispatch fails.
//!
//! ## Example
//!
//! ```ignore
//! struct ChargeCard { gateway: Arc<Gateway> }
//!
//! impl CommandHandler<Charge> for ChargeCard {
//!     fn handle(&self, command: &Charge) -> Result<Value, HandlerError> {
//!         let receipt = self.gateway.charge(&command.card, command.amount)?;
//!         Ok(json!({ "receipt": receipt }))
//!     }
//! }
//!
//! impl RollbackHandler<Charge> for ChargeCard {
//!     fn rollback(&self, command: &Charge) -> Result<(), HandlerError> {
//!         self.gateway.refund(&command.card, command.amount)
//!     }
//! }
//! ```

mod erased;

pub(crate) use erased::{
    ErasedCommandHandler, ErasedQueryHandler, ErasedRollback, TypedCommandHandler,
    TypedQueryHandler, TypedRollback,
};

use serde_json::Value;

use crate::error::HandlerError;
use crate::message::{Command, Query};

/// Handles one command type.
pub trait CommandHandler<C: Command>: Send + Sync {
    fn handle(&self, command: &C) -> Result<Value, HandlerError>;
}

/// Compensating action for non-transactional side effects of a command.
pub trait RollbackHandler<C: Command>: Send + Sync {
    fn rollback(&self, command: &C) -> Result<(), HandlerError>;
}

/// Handles one query type.
pub trait QueryHandler<Q: Query>: Send + Sync {
    fn handle(&self, query: &Q) -> Result<Value, HandlerError>;
}

/// Adapts a closure into a command or query handler.
pub struct HandlerFn<F>(pub F);

impl<C, F> CommandHandler<C> for HandlerFn<F>
where
    C: Command,
    F: Fn(&C) -> Result<Value, HandlerError> + Send + Sync,
{
    fn handle(&self, command: &C) -> Result<Value, HandlerError> {
        (self.0)(command)
    }
}

impl<Q, F> QueryHandler<Q> for HandlerFn<F>
where
    Q: Query,
    F: Fn(&Q) -> Result<Value, HandlerError> + Send + Sync,
{
    fn handle(&self, query: &Q) -> Result<Value, HandlerError> {
        (self.0)(query)
    }
}
