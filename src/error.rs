//! Error types for dispatch and handler execution.

use std::error::Error;

use thiserror::Error;

use crate::message::RequestKind;
use crate::queue::SubmitError;
use crate::transaction::{StoreError, TransactionError};

/// Error raised by a command, query or rollback handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// Business logic rejected the request (validation, invariant violation).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The transactional store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Other error.
    #[error("handler error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

/// Error returned by the command and query buses.
///
/// The bus never wraps or replaces a failure raised by a handler or a
/// middleware step: it reaches the caller as the same value.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler registered for the request type.
    #[error("no {kind} handler registered for {name}")]
    HandlerNotFound { kind: RequestKind, name: String },
    /// A handler or middleware step failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
    /// Commit or rollback failed in the transaction manager.
    #[error("transaction failed: {0}")]
    Transaction(#[from] TransactionError),
    /// Handing the command to the queue runtime failed.
    #[error("queue submission failed: {0}")]
    QueueSubmission(#[from] SubmitError),
    /// Shared dispatcher state was poisoned by a panicking thread.
    #[error("dispatcher state poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        DispatchError::Handler(HandlerError::Store(err))
    }
}

impl DispatchError {
    pub(crate) fn not_found(kind: RequestKind, name: impl Into<String>) -> Self {
        DispatchError::HandlerNotFound {
            kind,
            name: name.into(),
        }
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::HandlerNotFound { .. } => 404,
            DispatchError::Handler(HandlerError::DecodeFailed(_)) => 400,
            DispatchError::Handler(HandlerError::Rejected(_)) => 422,
            DispatchError::Handler(HandlerError::NotFound(_)) => 404,
            DispatchError::Handler(_) => 500,
            DispatchError::Transaction(_) => 500,
            DispatchError::QueueSubmission(_) => 503,
            DispatchError::LockPoisoned(_) => 500,
        }
    }
}
