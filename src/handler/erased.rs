use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use super::{CommandHandler, QueryHandler, RollbackHandler};
use crate::error::HandlerError;
use crate::message::{Command, Payload, Query};

pub(crate) trait ErasedCommandHandler: Send + Sync {
    fn handle(&self, command: &dyn Payload) -> Result<Value, HandlerError>;

    /// Decode a JSON-encoded command of the bound type.
    fn decode(&self, payload: &[u8]) -> Result<Box<dyn Payload>, HandlerError>;

    fn handler_name(&self) -> &'static str;
}

pub(crate) trait ErasedRollback: Send + Sync {
    fn rollback(&self, command: &dyn Payload) -> Result<(), HandlerError>;
}

pub(crate) trait ErasedQueryHandler: Send + Sync {
    fn handle(&self, query: &dyn Payload) -> Result<Value, HandlerError>;

    fn handler_name(&self) -> &'static str;
}

fn downcast<T: 'static>(payload: &dyn Payload) -> Result<&T, HandlerError> {
    payload
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| HandlerError::DecodeFailed(format!("payload is not a {}", type_name::<T>())))
}

pub(crate) struct TypedCommandHandler<C, H> {
    handler: Arc<H>,
    _command: PhantomData<fn(&C)>,
}

impl<C, H> TypedCommandHandler<C, H> {
    pub(crate) fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _command: PhantomData,
        }
    }
}

impl<C, H> ErasedCommandHandler for TypedCommandHandler<C, H>
where
    C: Command,
    H: CommandHandler<C> + 'static,
{
    fn handle(&self, command: &dyn Payload) -> Result<Value, HandlerError> {
        self.handler.handle(downcast::<C>(command)?)
    }

    fn decode(&self, payload: &[u8]) -> Result<Box<dyn Payload>, HandlerError> {
        let command: C = serde_json::from_slice(payload)?;
        Ok(Box::new(command))
    }

    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }
}

pub(crate) struct TypedRollback<C, H> {
    handler: Arc<H>,
    _command: PhantomData<fn(&C)>,
}

impl<C, H> TypedRollback<C, H> {
    pub(crate) fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _command: PhantomData,
        }
    }
}

impl<C, H> ErasedRollback for TypedRollback<C, H>
where
    C: Command,
    H: RollbackHandler<C> + 'static,
{
    fn rollback(&self, command: &dyn Payload) -> Result<(), HandlerError> {
        self.handler.rollback(downcast::<C>(command)?)
    }
}

pub(crate) struct TypedQueryHandler<Q, H> {
    handler: H,
    _query: PhantomData<fn(&Q)>,
}

impl<Q, H> TypedQueryHandler<Q, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _query: PhantomData,
        }
    }
}

impl<Q, H> ErasedQueryHandler for TypedQueryHandler<Q, H>
where
    Q: Query,
    H: QueryHandler<Q> + 'static,
{
    fn handle(&self, query: &dyn Payload) -> Result<Value, HandlerError> {
        self.handler.handle(downcast::<Q>(query)?)
    }

    fn handler_name(&self) -> &'static str {
        type_name::<H>()
    }
}
