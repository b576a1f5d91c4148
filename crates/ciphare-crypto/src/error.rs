use ciphare_core::CiphareError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Tag verification failed. Deliberately says nothing about whether the
    /// password was wrong or the data was damaged.
    #[error("invalid password or corrupted data")]
    Authentication,

    /// Stored auxiliary values are the wrong shape; raised before any
    /// decryption is attempted.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("algorithm '{name}' is not supported (available: {available})")]
    UnsupportedAlgorithm { name: String, available: String },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed")]
    Encryption,
}

impl From<CryptoError> for CiphareError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Authentication => CiphareError::Authentication,
            CryptoError::MalformedMetadata(msg) => CiphareError::MalformedMetadata(msg),
            CryptoError::UnsupportedAlgorithm { name, available } => {
                CiphareError::UnsupportedAlgorithm { name, available }
            }
            other => CiphareError::Other(anyhow::Error::new(other)),
        }
    }
}
