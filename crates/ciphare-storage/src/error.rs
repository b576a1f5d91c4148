use ciphare_core::CiphareError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Insert hit the uniqueness constraint on the artifact id.
    #[error("artifact id already exists: {0}")]
    Conflict(String),

    #[error("storage call timed out: {0}")]
    Timeout(String),

    #[error("backend error: {message}")]
    Backend { message: String, temporary: bool },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Timeout(_) | StorageError::Backend { temporary: true, .. }
        )
    }
}

impl From<opendal::Error> for StorageError {
    fn from(e: opendal::Error) -> Self {
        StorageError::Backend {
            temporary: e.is_temporary(),
            message: e.to_string(),
        }
    }
}

impl From<StorageError> for CiphareError {
    fn from(e: StorageError) -> Self {
        CiphareError::Storage {
            retryable: e.is_retryable(),
            message: e.to_string(),
        }
    }
}
