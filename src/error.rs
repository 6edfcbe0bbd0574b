use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub type PaceResult<T> = Result<T, PaceError>;

impl PaceError {
    pub(crate) fn poisoned(what: &str) -> Self {
        PaceError::InternalError(format!("Failed to acquire lock on {}", what))
    }
}
