use thiserror::Error;

/// Failure talking to the OS process collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("process backend unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    Permission(String),
}

/// Reading the process table failed; the previous snapshot stays current
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to refresh process list: {0}")]
pub struct FetchError(#[from] pub BackendError);

/// Termination was not delivered, or was delivered and refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KillError {
    #[error("failed to kill process: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to kill process {pid}")]
    Refused { pid: u32 },
}
