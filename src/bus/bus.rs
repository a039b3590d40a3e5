//! Bus - one pipeline shared by the command and query sides.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::command_bus::{CommandBus, Dispatched};
use super::query_bus::QueryBus;
use crate::config::BusConfig;
use crate::error::DispatchError;
use crate::message::{Command, Query};
use crate::middleware::{LoggingMiddleware, Middleware, MiddlewarePipeline};
use crate::queue::{InMemoryJobQueue, QueueRuntime};
use crate::registry::Registry;
use crate::transaction::{NoTransaction, TransactionManager};

/// Command and query buses built around one registry and one pipeline.
///
/// ## Example
///
/// ```ignore
/// let config = BusConfig::load("routed.toml")?;
/// let registry = Registry::builder()
///     .command::<PlaceOrder, _>(PlaceOrderHandler::new(store.clone()))
///     .query::<GetOrder, _>(GetOrderHandler::new(store.clone()))
///     .with_config(&config)
///     .build()?;
///
/// let bus = Bus::builder(registry)
///     .config(config)
///     .transactions(Arc::new(store))
///     .build();
///
/// bus.dispatch(PlaceOrder { id: "o-1".into() })?;
/// let order = bus.ask(GetOrder { id: "o-1".into() })?;
/// ```
pub struct Bus {
    commands: CommandBus,
    queries: QueryBus,
    job_queue: Option<InMemoryJobQueue>,
    config: BusConfig,
}

impl Bus {
    pub fn builder(registry: impl Into<Arc<Registry>>) -> BusBuilder {
        BusBuilder::new(registry)
    }

    pub fn dispatch<C: Command>(&self, command: C) -> Result<Dispatched, DispatchError> {
        self.commands.dispatch(command)
    }

    pub fn dispatch_async<C: Command>(&self, command: C) -> Result<Dispatched, DispatchError> {
        self.commands.dispatch_async(command)
    }

    pub fn dispatch_with<C: Command>(
        &self,
        command: C,
        explicit_async: bool,
    ) -> Result<Dispatched, DispatchError> {
        self.commands.dispatch_with(command, explicit_async)
    }

    pub fn ask<Q: Query>(&self, query: Q) -> Result<Value, DispatchError> {
        self.queries.ask(query)
    }

    pub fn ask_as<Q: Query, T: DeserializeOwned>(&self, query: Q) -> Result<T, DispatchError> {
        self.queries.ask_as(query)
    }

    pub fn commands(&self) -> &CommandBus {
        &self.commands
    }

    pub fn queries(&self) -> &QueryBus {
        &self.queries
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.commands.registry()
    }

    /// The built-in job queue, when no other runtime was supplied.
    pub fn job_queue(&self) -> Option<&InMemoryJobQueue> {
        self.job_queue.as_ref()
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }
}

/// Builder for [`Bus`].
///
/// Defaults: `NoTransaction`, an `InMemoryJobQueue` on the configured default
/// queue, and `LoggingMiddleware` as the outermost interceptor when
/// `[logging] enabled`.
pub struct BusBuilder {
    registry: Arc<Registry>,
    config: BusConfig,
    middleware: Vec<Arc<dyn Middleware>>,
    transactions: Option<Arc<dyn TransactionManager>>,
    queue: Option<Arc<dyn QueueRuntime>>,
}

impl BusBuilder {
    pub fn new(registry: impl Into<Arc<Registry>>) -> Self {
        Self {
            registry: registry.into(),
            config: BusConfig::default(),
            middleware: Vec::new(),
            transactions: None,
            queue: None,
        }
    }

    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Append an interceptor after the built-in ones.
    pub fn pipe<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn pipe_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn transactions(mut self, manager: Arc<dyn TransactionManager>) -> Self {
        self.transactions = Some(manager);
        self
    }

    pub fn queue(mut self, runtime: Arc<dyn QueueRuntime>) -> Self {
        self.queue = Some(runtime);
        self
    }

    pub fn build(self) -> Bus {
        let mut pipeline = MiddlewarePipeline::new();
        if self.config.logging.enabled {
            pipeline = pipeline.pipe(LoggingMiddleware::from_config(&self.config.logging));
        }
        let pipeline = self
            .middleware
            .into_iter()
            .fold(pipeline, MiddlewarePipeline::pipe_arc);

        let (queue, job_queue) = match self.queue {
            Some(runtime) => (runtime, None),
            None => {
                let job_queue = InMemoryJobQueue::new(self.config.default_queue.clone());
                let runtime: Arc<dyn QueueRuntime> = Arc::new(job_queue.clone());
                (runtime, Some(job_queue))
            }
        };

        let transactions = self
            .transactions
            .unwrap_or_else(|| Arc::new(NoTransaction));

        Bus {
            commands: CommandBus::new(
                Arc::clone(&self.registry),
                pipeline.clone(),
                transactions,
                queue,
            ),
            queries: QueryBus::new(self.registry, pipeline),
            job_queue,
            config: self.config,
        }
    }
}
