use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use super::error::RegistryError;
use super::registry::{CommandBinding, QueryBinding, Registry};
use crate::config::BusConfig;
use crate::error::HandlerError;
use crate::handler::{
    CommandHandler, ErasedRollback, HandlerFn, QueryHandler, RollbackHandler,
    TypedCommandHandler, TypedQueryHandler, TypedRollback,
};
use crate::message::{Command, Query};

/// Collects handler registrations and produces an immutable [`Registry`].
///
/// Registration methods use the builder pattern and return `self`. The first
/// registration error is remembered and reported by `build()`.
pub struct RegistryBuilder {
    commands: HashMap<TypeId, CommandBinding>,
    queries: HashMap<TypeId, QueryBinding>,
    command_names: HashMap<&'static str, TypeId>,
    transaction_overrides: BTreeMap<String, bool>,
    error: Option<RegistryError>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            queries: HashMap::new(),
            command_names: HashMap::new(),
            transaction_overrides: BTreeMap::new(),
            error: None,
        }
    }

    /// Register a command handler that runs inside a transaction.
    pub fn command<C, H>(self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.bind_command::<C, H>(Arc::new(handler), true, None)
    }

    /// Register a command handler that runs without a transaction.
    pub fn command_outside_transaction<C, H>(self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.bind_command::<C, H>(Arc::new(handler), false, None)
    }

    /// Register a command handler that also compensates on failure.
    pub fn command_with_rollback<C, H>(self, handler: H, in_transaction: bool) -> Self
    where
        C: Command,
        H: CommandHandler<C> + RollbackHandler<C> + 'static,
    {
        let handler = Arc::new(handler);
        let rollback: Arc<dyn ErasedRollback> =
            Arc::new(TypedRollback::<C, H>::new(Arc::clone(&handler)));
        self.bind_command::<C, H>(handler, in_transaction, Some(rollback))
    }

    /// Register a closure as a command handler.
    pub fn command_fn<C, F>(self, in_transaction: bool, handler: F) -> Self
    where
        C: Command,
        F: Fn(&C) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.bind_command::<C, HandlerFn<F>>(Arc::new(HandlerFn(handler)), in_transaction, None)
    }

    pub fn query<Q, H>(self, handler: H) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let binding = QueryBinding {
            name: Q::name(),
            handler: Arc::new(TypedQueryHandler::<Q, H>::new(handler)),
        };
        self.insert_query(TypeId::of::<Q>(), binding)
    }

    /// Register a closure as a query handler.
    pub fn query_fn<Q, F>(self, handler: F) -> Self
    where
        Q: Query,
        F: Fn(&Q) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.query::<Q, HandlerFn<F>>(HandlerFn(handler))
    }

    /// Apply per-command overrides (`[commands."name"] in_transaction = ...`).
    pub fn with_config(mut self, config: &BusConfig) -> Self {
        for (name, command) in &config.commands {
            if let Some(in_transaction) = command.in_transaction {
                self.transaction_overrides.insert(name.clone(), in_transaction);
            }
        }
        self
    }

    pub fn build(mut self) -> Result<Registry, RegistryError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        for (name, in_transaction) in &self.transaction_overrides {
            let binding = self
                .command_names
                .get(name.as_str())
                .and_then(|type_id| self.commands.get_mut(type_id))
                .ok_or_else(|| RegistryError::UnknownOverride(name.clone()))?;
            binding.requires_transaction = *in_transaction;
        }

        Ok(Registry::from_parts(
            self.commands,
            self.queries,
            self.command_names,
        ))
    }

    fn bind_command<C, H>(
        self,
        handler: Arc<H>,
        in_transaction: bool,
        rollback: Option<Arc<dyn ErasedRollback>>,
    ) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let binding = CommandBinding {
            name: C::name(),
            handler: Arc::new(TypedCommandHandler::<C, H>::new(handler)),
            rollback,
            requires_transaction: in_transaction,
            async_options: <C as Command>::async_options,
        };
        self.insert_command(TypeId::of::<C>(), binding)
    }

    fn insert_command(mut self, type_id: TypeId, binding: CommandBinding) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.commands.contains_key(&type_id) {
            self.error = Some(RegistryError::DuplicateCommand(binding.name.to_string()));
            return self;
        }
        if self.command_names.contains_key(binding.name) {
            self.error = Some(RegistryError::DuplicateName(binding.name.to_string()));
            return self;
        }
        self.command_names.insert(binding.name, type_id);
        self.commands.insert(type_id, binding);
        self
    }

    fn insert_query(mut self, type_id: TypeId, binding: QueryBinding) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.queries.contains_key(&type_id) {
            self.error = Some(RegistryError::DuplicateQuery(binding.name.to_string()));
            return self;
        }
        self.queries.insert(type_id, binding);
        self
    }
}
