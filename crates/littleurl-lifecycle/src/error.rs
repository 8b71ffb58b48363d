use littleurl_core::{CoreError, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid settings: {0}")]
    Settings(#[from] CoreError),
    #[error("no unused key found after {0} attempts")]
    KeysExhausted(u32),
    #[error("cannot schedule purge: {0}")]
    Schedule(String),
}
