use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::envelope::DeferredCommand;

/// Acknowledgement returned by a queue runtime for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The runtime no longer accepts work.
    #[error("queue {0} is closed")]
    Closed(String),
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("queue state poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// Accepts deferred commands for out-of-band execution.
///
/// A successful `submit` must eventually lead to one `execute` of the
/// envelope (at-least-once is acceptable). `queue` and `delay_seconds` are the
/// command's async annotation, forwarded verbatim; `None` means the runtime's
/// own default.
pub trait QueueRuntime: Send + Sync {
    fn submit(
        &self,
        envelope: DeferredCommand,
        queue: Option<&str>,
        delay_seconds: Option<u64>,
    ) -> Result<JobId, SubmitError>;
}
