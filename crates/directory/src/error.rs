use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid phone number: {0:?}")]
    InvalidNumber(String),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Failures of the bounded lookup used on the call path.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("lookup worker went away before answering")]
    WorkerGone,
    #[error(transparent)]
    Storage(#[from] DirectoryError),
}
