//! Error taxonomy for the task execution core.

use thiserror::Error;

/// Errors returned synchronously by [`crate::services::registry::Registry`]
/// lookups and [`crate::services::dispatcher::Dispatcher`] submission.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid submission: {0}")]
    InvalidInput(String),

    #[error("instance not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("storage failed: {0}")]
    StorageFailed(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageFailed(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageFailed(err.to_string())
    }
}

/// Narrower error returned by [`crate::domain::ports::SnapshotStore`]
/// operations. Kept distinct from [`CoreError`] so the store crate-internal
/// boundary doesn't leak dispatcher-specific variants; the dispatcher maps
/// it onto `CoreError::StorageFailed` / `CoreError::Internal`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("path traversal detected for key {0}")]
    PathTraversal(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PathTraversal(key) => {
                Self::Internal(format!("path traversal detected: {key}"))
            }
            other => Self::StorageFailed(other.to_string()),
        }
    }
}

/// Fatal registration-time error. `Registry::register` aborts the process
/// on this, mirroring the teacher's startup-time `panic!`-on-invalid-config
/// convention; it is never meant to be caught at runtime.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("task kind config is invalid: {0}")]
    InvalidConfig(String),

    #[error("task id {0:?} already registered")]
    DuplicateTaskId(String),
}

/// Error returned by `Dispatcher::start`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("dispatcher already started")]
    AlreadyRunning,

    #[error("notification sender must be set before start")]
    NotificationSenderUnset,
}

/// Error returned by `Dispatcher::submit`.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("dispatcher inbox is closed")]
    Closed,

    #[error("dispatcher is shutting down, no longer accepting submissions")]
    ShuttingDown,
}
