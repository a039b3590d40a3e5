use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::DispatchError;
use crate::message::{AsyncCommand, Command, Payload, Request};
use crate::middleware::MiddlewarePipeline;
use crate::queue::{DeferredCommand, JobId, JobRecord, QueueRuntime};
use crate::registry::{CommandBinding, Registry};
use crate::transaction::TransactionManager;

/// Outcome of a command dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The handler ran inline and returned this value.
    Completed(Value),
    /// The command was handed to the queue runtime.
    Queued(JobId),
}

impl Dispatched {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Dispatched::Completed(value) => Some(value),
            Dispatched::Queued(_) => None,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Dispatched::Completed(_) => None,
            Dispatched::Queued(id) => Some(id),
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Dispatched::Queued(_))
    }
}

/// Routes commands to their handlers.
///
/// A command whose type carries an async annotation, or one dispatched with
/// `explicit_async`, is wrapped in a [`DeferredCommand`] and submitted to the
/// queue runtime. Everything else runs inline: through the middleware
/// pipeline, inside a transaction when the binding asks for one, with the
/// handler's rollback invoked if the dispatch fails.
pub struct CommandBus {
    registry: Arc<Registry>,
    pipeline: MiddlewarePipeline,
    transactions: Arc<dyn TransactionManager>,
    queue: Arc<dyn QueueRuntime>,
    async_cache: RwLock<HashMap<TypeId, Option<Arc<AsyncCommand>>>>,
}

impl CommandBus {
    pub fn new(
        registry: Arc<Registry>,
        pipeline: MiddlewarePipeline,
        transactions: Arc<dyn TransactionManager>,
        queue: Arc<dyn QueueRuntime>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            transactions,
            queue,
            async_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &MiddlewarePipeline {
        &self.pipeline
    }

    /// Dispatch inline, unless the command type is annotated as async.
    pub fn dispatch<C: Command>(&self, command: C) -> Result<Dispatched, DispatchError> {
        self.dispatch_with(command, false)
    }

    /// Always hand the command to the queue runtime.
    pub fn dispatch_async<C: Command>(&self, command: C) -> Result<Dispatched, DispatchError> {
        self.dispatch_with(command, true)
    }

    pub fn dispatch_with<C: Command>(
        &self,
        command: C,
        explicit_async: bool,
    ) -> Result<Dispatched, DispatchError> {
        let options = self.async_options::<C>()?;
        let binding = self.registry.command::<C>()?;

        if options.is_some() || explicit_async {
            return self.defer(binding, Box::new(command), options);
        }

        self.run_inline(binding, &command).map(Dispatched::Completed)
    }

    /// The async annotation for `C`, computed once per type.
    ///
    /// Repeated calls return the same `Arc` (or the same cached `None`).
    pub fn async_options<C: Command>(&self) -> Result<Option<Arc<AsyncCommand>>, DispatchError> {
        let type_id = TypeId::of::<C>();
        {
            let cache = self
                .async_cache
                .read()
                .map_err(|_| DispatchError::LockPoisoned("async annotation lookup"))?;
            if let Some(cached) = cache.get(&type_id) {
                return Ok(cached.clone());
            }
        }

        let computed = C::async_options().map(Arc::new);
        let mut cache = self
            .async_cache
            .write()
            .map_err(|_| DispatchError::LockPoisoned("async annotation insert"))?;
        // A racing writer may have got here first; keep its entry.
        Ok(cache.entry(type_id).or_insert(computed).clone())
    }

    /// Rebuild an executable envelope from a persisted job record.
    pub fn rehydrate(&self, record: &JobRecord) -> Result<DeferredCommand, DispatchError> {
        let binding = self.registry.command_by_name(&record.command)?;
        let command = binding.handler().decode(&record.payload)?;

        let options = (binding.async_options)().map(|_| {
            Arc::new(AsyncCommand {
                queue: record.queue.clone(),
                delay_seconds: record.delay_seconds,
            })
        });

        let middleware = self.pipeline.names();
        if record.middleware != middleware {
            tracing::warn!(
                job = %record.id,
                recorded = ?record.middleware,
                current = ?middleware,
                "job recorded with a different middleware pipeline"
            );
        }

        Ok(DeferredCommand::new(
            binding.name(),
            Arc::clone(binding.handler()),
            command,
            options,
            self.pipeline.clone(),
        ))
    }

    fn defer(
        &self,
        binding: &CommandBinding,
        command: Box<dyn Payload>,
        options: Option<Arc<AsyncCommand>>,
    ) -> Result<Dispatched, DispatchError> {
        let queue = options.as_ref().and_then(|o| o.queue.clone());
        let delay_seconds = options.as_ref().and_then(|o| o.delay_seconds);

        let envelope = DeferredCommand::new(
            binding.name(),
            Arc::clone(binding.handler()),
            command,
            options,
            self.pipeline.clone(),
        );

        let id = self.queue.submit(envelope, queue.as_deref(), delay_seconds)?;
        tracing::debug!(
            command = binding.name(),
            job = %id,
            queue = ?queue,
            delay_seconds = ?delay_seconds,
            "command deferred"
        );
        Ok(Dispatched::Queued(id))
    }

    fn run_inline<C: Command>(
        &self,
        binding: &CommandBinding,
        command: &C,
    ) -> Result<Value, DispatchError> {
        let handler = binding.handler();
        let transactions = &self.transactions;
        let requires_transaction = binding.requires_transaction();

        let terminal = |request: &Request<'_>| -> Result<Value, DispatchError> {
            let body = request.body();
            if requires_transaction {
                transactions.run_in_transaction(&mut || Ok(handler.handle(body)?))
            } else {
                Ok(handler.handle(body)?)
            }
        };

        let result = self.pipeline.process(&Request::command(command), &terminal);

        // Any transaction has already been rolled back at this point.
        if let (Err(err), Some(rollback)) = (&result, binding.rollback()) {
            if let Err(rollback_err) = rollback.rollback(command) {
                tracing::warn!(
                    command = binding.name(),
                    error = %err,
                    rollback_error = %rollback_err,
                    "rollback failed"
                );
            }
        }

        result
    }
}
