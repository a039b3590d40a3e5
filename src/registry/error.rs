use thiserror::Error;

/// Error raised while building or verifying a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A second handler was registered for the same command type.
    #[error("duplicate command handler for {0}")]
    DuplicateCommand(String),
    /// A second handler was registered for the same query type.
    #[error("duplicate query handler for {0}")]
    DuplicateQuery(String),
    /// Two different command types share a name.
    #[error("command name {0} is used by more than one type")]
    DuplicateName(String),
    /// A config override names a command that has no handler.
    #[error("config override for unknown command {0}")]
    UnknownOverride(String),
    /// The built registry differs from a precomputed snapshot.
    #[error("registry does not match snapshot: {}", .0.join("; "))]
    SnapshotMismatch(Vec<String>),
}

/// Error raised while reading or writing a registry snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode snapshot: {0}")]
    Json(#[from] serde_json::Error),
}
