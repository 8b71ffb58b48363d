use thiserror::Error;

/// Errors related to the core value types.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid short key: {0}")]
    InvalidShortKey(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Errors surfaced by a [`RecordStore`](crate::RecordStore) backend.
///
/// Backends never retry; every variant describes the outcome of a single
/// attempt against the backing store.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("invalid continuation token: {0}")]
    InvalidContinuationToken(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Errors returned by the [`LittleUrl`](crate::LittleUrl) facade.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("URL does not exist.")]
    NotFound,
    #[error("URL could not be created: {0}")]
    CreateFailed(String),
    #[error("storage failure: {0}")]
    Storage(String),
}
