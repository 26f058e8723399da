//! Error types for the role repository.

use thiserror::Error;

/// The main error type for role repository operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The role name does not satisfy the configured name policy.
    #[error("'{0}' is not a valid role name")]
    InvalidRoleName(String),

    /// An update tried to rename a role.
    #[error("Updated role '{updated}' has a different name than existing role '{existing}'")]
    RoleNameMismatch {
        /// Name of the record the caller started from.
        existing: String,
        /// Name of the replacement record.
        updated: String,
    },

    /// Role with the given name already exists.
    #[error("Role '{0}' already exists")]
    RoleAlreadyExists(String),

    /// The record supplied as the starting point of an update is stale.
    #[error("Role '{0}' was modified concurrently")]
    ConcurrentModification(String),

    /// The persistence sink failed to commit the role set.
    #[error("Persistence commit failed: {0}")]
    Persistence(String),

    /// I/O failure inside a persistence sink.
    #[cfg(feature = "persistence")]
    #[error("Persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error inside a persistence sink.
    #[cfg(feature = "persistence")]
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A background task running an operation panicked or was cancelled.
    #[error("Repository task failed: {0}")]
    TaskFailed(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller-supplied data violates a precondition. Permanent rejection.
    Validation,
    /// Name collision on create. Permanent rejection.
    DuplicateName,
    /// The caller's view was stale. Re-read and retry.
    ConcurrentModification,
    /// The durable commit failed; in-memory and durable state may diverge.
    Persistence,
    /// The repository was configured incorrectly.
    Configuration,
    /// The operation did not run to completion. Its effects are unknown.
    Internal,
}

impl Error {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRoleName(_) | Error::RoleNameMismatch { .. } => ErrorKind::Validation,
            Error::RoleAlreadyExists(_) => ErrorKind::DuplicateName,
            Error::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
            Error::Persistence(_) => ErrorKind::Persistence,
            #[cfg(feature = "persistence")]
            Error::Io(_) | Error::Serialization(_) => ErrorKind::Persistence,
            Error::InvalidConfiguration(_) => ErrorKind::Configuration,
            Error::TaskFailed(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the caller should re-read and retry.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrentModification
    }
}

/// Result type alias for role repository operations.
pub type Result<T> = std::result::Result<T, Error>;
