use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builder::RegistryBuilder;
use super::error::RegistryError;
use super::snapshot::{CommandEntry, QueryEntry, RegistrySnapshot};
use crate::error::DispatchError;
use crate::handler::{ErasedCommandHandler, ErasedQueryHandler, ErasedRollback};
use crate::message::{AsyncCommand, Command, Query, RequestKind};

/// Registry entry for one command type.
#[derive(Clone)]
pub struct CommandBinding {
    pub(crate) name: &'static str,
    pub(crate) handler: Arc<dyn ErasedCommandHandler>,
    pub(crate) rollback: Option<Arc<dyn ErasedRollback>>,
    pub(crate) requires_transaction: bool,
    pub(crate) async_options: fn() -> Option<AsyncCommand>,
}

impl CommandBinding {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.handler_name()
    }

    pub fn requires_transaction(&self) -> bool {
        self.requires_transaction
    }

    /// Whether the handler registered a compensating rollback.
    pub fn has_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    pub(crate) fn handler(&self) -> &Arc<dyn ErasedCommandHandler> {
        &self.handler
    }

    pub(crate) fn rollback(&self) -> Option<&Arc<dyn ErasedRollback>> {
        self.rollback.as_ref()
    }
}

impl fmt::Debug for CommandBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBinding")
            .field("name", &self.name)
            .field("handler", &self.handler_name())
            .field("requires_transaction", &self.requires_transaction)
            .field("has_rollback", &self.has_rollback())
            .finish()
    }
}

/// Registry entry for one query type. Queries never run in a transaction.
#[derive(Clone)]
pub struct QueryBinding {
    pub(crate) name: &'static str,
    pub(crate) handler: Arc<dyn ErasedQueryHandler>,
}

impl QueryBinding {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.handler_name()
    }

    pub(crate) fn handler(&self) -> &Arc<dyn ErasedQueryHandler> {
        &self.handler
    }
}

impl fmt::Debug for QueryBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBinding")
            .field("name", &self.name)
            .field("handler", &self.handler_name())
            .finish()
    }
}

/// Immutable map from `(kind, TypeId)` to handler binding.
#[derive(Debug)]
pub struct Registry {
    commands: HashMap<TypeId, CommandBinding>,
    queries: HashMap<TypeId, QueryBinding>,
    command_names: HashMap<&'static str, TypeId>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn from_parts(
        commands: HashMap<TypeId, CommandBinding>,
        queries: HashMap<TypeId, QueryBinding>,
        command_names: HashMap<&'static str, TypeId>,
    ) -> Self {
        Self {
            commands,
            queries,
            command_names,
        }
    }

    /// Look up the binding for command type `C`.
    pub fn command<C: Command>(&self) -> Result<&CommandBinding, DispatchError> {
        self.commands
            .get(&TypeId::of::<C>())
            .ok_or_else(|| DispatchError::not_found(RequestKind::Command, C::name()))
    }

    /// Look up the binding for query type `Q`.
    pub fn query<Q: Query>(&self) -> Result<&QueryBinding, DispatchError> {
        self.queries
            .get(&TypeId::of::<Q>())
            .ok_or_else(|| DispatchError::not_found(RequestKind::Query, Q::name()))
    }

    /// Look up a command binding by its registered name (used for job records).
    pub fn command_by_name(&self, name: &str) -> Result<&CommandBinding, DispatchError> {
        self.command_names
            .get(name)
            .and_then(|type_id| self.commands.get(type_id))
            .ok_or_else(|| DispatchError::not_found(RequestKind::Command, name))
    }

    /// Registered command names.
    pub fn commands(&self) -> Vec<&str> {
        self.commands.values().map(|b| b.name).collect()
    }

    /// Registered query names.
    pub fn queries(&self) -> Vec<&str> {
        self.queries.values().map(|b| b.name).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.queries.is_empty()
    }

    /// Describe the registry as a serializable map.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let commands = self
            .commands
            .values()
            .map(|binding| {
                let options = (binding.async_options)();
                let entry = CommandEntry {
                    handler: binding.handler_name().to_string(),
                    transaction: binding.requires_transaction,
                    rollback: binding.has_rollback(),
                    deferred: options.is_some(),
                    queue: options.as_ref().and_then(|o| o.queue.clone()),
                    delay_seconds: options.as_ref().and_then(|o| o.delay_seconds),
                };
                (binding.name.to_string(), entry)
            })
            .collect();

        let queries = self
            .queries
            .values()
            .map(|binding| {
                let entry = QueryEntry {
                    handler: binding.handler_name().to_string(),
                };
                (binding.name.to_string(), entry)
            })
            .collect();

        RegistrySnapshot { commands, queries }
    }

    /// Check the registry against a precomputed snapshot.
    pub fn verify(&self, expected: &RegistrySnapshot) -> Result<(), RegistryError> {
        let drift = expected.diff(&self.snapshot());
        if drift.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::SnapshotMismatch(drift))
        }
    }
}
