//! Core error types for pomotrack-core.
//!
//! Caller misuse against the current state surfaces as [`InvalidOperation`].
//! Storage trouble surfaces as [`PersistenceError`], which the core mostly
//! logs and degrades around instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

use crate::task::TaskId;

/// Core error type for pomotrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The requested transition is illegal in the current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] InvalidOperation),

    /// Persistence gateway failures
    #[error("Persistence unavailable: {0}")]
    Persistence(#[from] PersistenceError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The session worker has shut down and no longer accepts commands.
    #[error("Session manager has stopped")]
    ManagerStopped,
}

/// Rejections of caller operations. None of these mutate state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("no task with id {0}")]
    UnknownTask(TaskId),

    #[error("cannot start completed task '{name}'")]
    TaskCompleted { name: String },

    #[error("another task is already in progress: '{active}'")]
    AnotherTaskActive { active: String },

    #[error("cannot delete task '{name}' while it is in progress")]
    DeleteInProgress { name: String },

    #[error("cannot delete the active task '{name}'")]
    DeleteActive { name: String },

    #[error("task '{name}' is not running")]
    NotRunning { name: String },

    #[error("task '{name}' is not paused")]
    NotPaused { name: String },

    #[error("task '{name}' is already completed")]
    AlreadyCompleted { name: String },
}

/// Persistence gateway errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Failed to read a backing file
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a backing file
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing state exists but cannot be decoded
    #[error("Corrupt data in {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Failed to encode state for writing
    #[error("Failed to encode {what}: {message}")]
    EncodeFailed { what: &'static str, message: String },

    /// Backend reported itself as unavailable
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Unknown settings key
    #[error("Unknown settings key: {0}")]
    UnknownKey(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_operation_converts_into_core_error() {
        let err: CoreError = InvalidOperation::TaskCompleted {
            name: "Write report".into(),
        }
        .into();
        assert!(matches!(err, CoreError::InvalidOperation(_)));
        assert_eq!(
            err.to_string(),
            "Invalid operation: cannot start completed task 'Write report'"
        );
    }

    #[test]
    fn persistence_error_message_names_path() {
        let err = PersistenceError::Corrupt {
            path: PathBuf::from("/tmp/tasks.json"),
            message: "expected value".into(),
        };
        assert!(err.to_string().contains("/tmp/tasks.json"));
    }
}
