use thiserror::Error;

pub type CiphareResult<T> = Result<T, CiphareError>;

/// Outward-facing error taxonomy.
///
/// Missing, expired and exhausted artifacts all collapse into `NotFound`, and
/// every tag failure is `Authentication`, so callers can never tell which one
/// they hit.
#[derive(Debug, Error)]
pub enum CiphareError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("algorithm '{name}' is not supported (available: {available})")]
    UnsupportedAlgorithm { name: String, available: String },

    #[error("artifact not found or expired")]
    NotFound,

    #[error("invalid password or corrupted data")]
    Authentication,

    #[error("malformed artifact metadata: {0}")]
    MalformedMetadata(String),

    #[error("storage error: {message}")]
    Storage { message: String, retryable: bool },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CiphareError {
    pub fn storage(message: impl Into<String>) -> Self {
        CiphareError::Storage {
            message: message.into(),
            retryable: false,
        }
    }

    /// Timeouts and transient outages; the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CiphareError::Storage { retryable: true, .. })
    }
}
