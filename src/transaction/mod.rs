//! Transaction boundary around synchronous command handlers.
//!
//! The command bus asks a [`TransactionManager`] to run the terminal handler
//! invocation when the binding requires a transaction. The manager commits
//! when the work returns `Ok` and rolls back when it returns `Err`, exactly
//! once per call.
//!
//! [`InMemoryStore`] is a transactional key/value store that doubles as a
//! manager, for tests and single-process services.

mod in_memory;
mod manager;

pub use in_memory::{InMemoryStore, StoreError};
pub use manager::{NoTransaction, TransactionError, TransactionManager, Work};
