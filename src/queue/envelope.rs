use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::runtime::JobId;
use crate::error::DispatchError;
use crate::handler::ErasedCommandHandler;
use crate::message::{AsyncCommand, Payload, Request, RequestKind};
use crate::middleware::MiddlewarePipeline;

/// A command captured for later execution.
///
/// Owns the handler, the command, the async annotation (if the type has one)
/// and the pipeline that was active at dispatch time. Executing consumes the
/// envelope, so it runs at most once.
pub struct DeferredCommand {
    name: &'static str,
    handler: Arc<dyn ErasedCommandHandler>,
    command: Box<dyn Payload>,
    options: Option<Arc<AsyncCommand>>,
    pipeline: MiddlewarePipeline,
}

impl DeferredCommand {
    pub(crate) fn new(
        name: &'static str,
        handler: Arc<dyn ErasedCommandHandler>,
        command: Box<dyn Payload>,
        options: Option<Arc<AsyncCommand>>,
        pipeline: MiddlewarePipeline,
    ) -> Self {
        Self {
            name,
            handler,
            command,
            options,
            pipeline,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The async annotation of the command type, if any.
    pub fn options(&self) -> Option<&AsyncCommand> {
        self.options.as_deref()
    }

    pub fn queue(&self) -> Option<&str> {
        self.options.as_ref().and_then(|o| o.queue.as_deref())
    }

    pub fn delay_seconds(&self) -> Option<u64> {
        self.options.as_ref().and_then(|o| o.delay_seconds)
    }

    pub fn pipeline(&self) -> &MiddlewarePipeline {
        &self.pipeline
    }

    /// Names of the carried middleware, outermost first.
    pub fn middleware(&self) -> Vec<String> {
        self.pipeline.names()
    }

    /// Borrow the command as `C`, if it is one.
    pub fn command<C: 'static>(&self) -> Option<&C> {
        self.body().as_any().downcast_ref::<C>()
    }

    /// Run the handler once, without middleware.
    pub fn execute(self) -> Result<Value, DispatchError> {
        Ok(self.handler.handle(self.body())?)
    }

    /// Run the handler once, inside the pipeline captured at dispatch time.
    pub fn execute_with_middleware(self) -> Result<Value, DispatchError> {
        let request = Request::from_payload(RequestKind::Command, self.name, self.body());
        let handler = &self.handler;
        self.pipeline
            .process(&request, &|request: &Request<'_>| {
                Ok(handler.handle(request.body())?)
            })
    }

    /// Serializable form for runtimes that persist jobs.
    pub fn to_record(&self, id: &JobId) -> Result<JobRecord, serde_json::Error> {
        let payload = serde_json::to_vec(&self.body().to_json()?)?;
        Ok(JobRecord {
            id: id.clone(),
            command: self.name.to_string(),
            queue: self.queue().map(str::to_string),
            delay_seconds: self.delay_seconds(),
            middleware: self.middleware(),
            payload,
        })
    }

    fn body(&self) -> &dyn Payload {
        &*self.command
    }
}

impl fmt::Debug for DeferredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredCommand")
            .field("name", &self.name)
            .field("handler", &self.handler.handler_name())
            .field("options", &self.options)
            .field("middleware", &self.pipeline)
            .finish()
    }
}

/// Persistable description of a deferred command.
///
/// `payload` is the JSON-encoded command; the record itself travels as
/// bitcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub command: String,
    pub queue: Option<String>,
    pub delay_seconds: Option<u64>,
    pub middleware: Vec<String>,
    pub payload: Vec<u8>,
}

impl JobRecord {
    pub fn encode(&self) -> Result<Vec<u8>, bitcode::Error> {
        bitcode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::deserialize(bytes)
    }
}
