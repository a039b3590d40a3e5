//! Type-erased request view shared by middleware and handlers.

use std::any::Any;

use serde::Serialize;
use serde_json::Value;

use super::{Command, Query, RequestKind};

/// Object-safe access to a request body.
///
/// Implemented for every serializable `'static` type, so commands and queries
/// get it for free.
pub trait Payload: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Encode the body as JSON (used for logging and job records).
    fn to_json(&self) -> Result<Value, serde_json::Error>;
}

impl<T> Payload for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A borrowed, type-erased request travelling through the pipeline.
///
/// Middleware sees every command and query through this view. It can read the
/// kind and name, encode the body, or downcast to a concrete type it knows.
#[derive(Clone, Copy)]
pub struct Request<'a> {
    kind: RequestKind,
    name: &'static str,
    body: &'a dyn Payload,
}

impl<'a> Request<'a> {
    pub fn command<C: Command>(command: &'a C) -> Self {
        let body: &'a dyn Payload = command;
        Self::from_payload(RequestKind::Command, C::name(), body)
    }

    pub fn query<Q: Query>(query: &'a Q) -> Self {
        let body: &'a dyn Payload = query;
        Self::from_payload(RequestKind::Query, Q::name(), body)
    }

    pub(crate) fn from_payload(
        kind: RequestKind,
        name: &'static str,
        body: &'a dyn Payload,
    ) -> Self {
        Self { kind, name, body }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_command(&self) -> bool {
        self.kind == RequestKind::Command
    }

    /// Borrow the body as a concrete type, if it is one.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        self.body.as_any().downcast_ref::<T>()
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        self.body.to_json()
    }

    pub(crate) fn body(&self) -> &'a dyn Payload {
        self.body
    }
}

impl std::fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}
