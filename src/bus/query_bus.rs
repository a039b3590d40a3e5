use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DispatchError, HandlerError};
use crate::message::{Query, Request};
use crate::middleware::MiddlewarePipeline;
use crate::registry::Registry;

/// Routes queries to their handlers. Always synchronous, never transactional.
pub struct QueryBus {
    registry: Arc<Registry>,
    pipeline: MiddlewarePipeline,
}

impl QueryBus {
    pub fn new(registry: Arc<Registry>, pipeline: MiddlewarePipeline) -> Self {
        Self { registry, pipeline }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn ask<Q: Query>(&self, query: Q) -> Result<Value, DispatchError> {
        let handler = self.registry.query::<Q>()?.handler();
        self.pipeline
            .process(&Request::query(&query), &|request: &Request<'_>| {
                Ok(handler.handle(request.body())?)
            })
    }

    /// Ask and decode the result into `T`.
    pub fn ask_as<Q: Query, T: DeserializeOwned>(&self, query: Q) -> Result<T, DispatchError> {
        let value = self.ask(query)?;
        Ok(serde_json::from_value(value).map_err(HandlerError::from)?)
    }
}
