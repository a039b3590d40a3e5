use serde_json::Value;
use thiserror::Error;

use crate::error::DispatchError;

/// Failure inside the transaction manager itself (not the wrapped work).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("begin failed: {0}")]
    Begin(String),
    #[error("commit failed: {0}")]
    Commit(String),
    #[error("rollback failed: {0}")]
    Rollback(String),
    #[error("transaction state poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// The unit of work run inside a transaction.
pub type Work<'a> = dyn FnMut() -> Result<Value, DispatchError> + 'a;

/// Provides begin/commit/rollback around a unit of work.
pub trait TransactionManager: Send + Sync {
    /// Run `work`, commit if it returns `Ok`, roll back if it returns `Err`.
    ///
    /// The error returned by `work` must come back unchanged. A failure to
    /// commit or roll back is reported as `DispatchError::Transaction`.
    fn run_in_transaction(&self, work: &mut Work<'_>) -> Result<Value, DispatchError>;
}

/// Runs the work directly. Used when no transactional store is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransaction;

impl TransactionManager for NoTransaction {
    fn run_in_transaction(&self, work: &mut Work<'_>) -> Result<Value, DispatchError> {
        work()
    }
}
