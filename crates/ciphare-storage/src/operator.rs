//! OpenDAL Operator factory for ciphare blob backends

use anyhow::{Context, Result};
use ciphare_core::config::{BlobBackend, StorageConfig};
use opendal::Operator;
use secrecy::{ExposeSecret, SecretString};

/// S3 credentials, sourced from the environment
#[derive(Debug, Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl S3Credentials {
    /// Read `CIPHARE_S3_ACCESS_KEY_ID` / `CIPHARE_S3_SECRET_ACCESS_KEY`,
    /// falling back to the standard `AWS_*` variables.
    ///
    /// Returns `None` when no access key is set.
    pub fn from_env() -> Option<Self> {
        let access_key = std::env::var("CIPHARE_S3_ACCESS_KEY_ID")
            .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
            .unwrap_or_default();
        let secret_key = std::env::var("CIPHARE_S3_SECRET_ACCESS_KEY")
            .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
            .unwrap_or_default();

        if access_key.is_empty() {
            return None;
        }
        Some(S3Credentials {
            access_key_id: access_key,
            secret_access_key: SecretString::from(secret_key),
        })
    }
}

/// Build an OpenDAL Operator for the configured blob backend.
///
/// For `s3`, credentials are required. If `enforce_tls` is true and the
/// endpoint uses HTTP, this returns an error; otherwise a warning is logged
/// for non-HTTPS endpoints.
pub fn build_operator(storage: &StorageConfig, creds: Option<&S3Credentials>) -> Result<Operator> {
    let op = match storage.backend {
        BlobBackend::Memory => Operator::new(opendal::services::Memory::default())
            .context("creating OpenDAL memory operator")?
            .layer(opendal::layers::LoggingLayer::default())
            .finish(),
        BlobBackend::Fs => {
            let root = storage.root.to_string_lossy();
            Operator::new(opendal::services::Fs::default().root(&root))
                .with_context(|| format!("creating OpenDAL fs operator at {root}"))?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }
        BlobBackend::S3 => {
            let creds = creds.context(
                "storage.backend = \"s3\" needs CIPHARE_S3_ACCESS_KEY_ID / \
                 CIPHARE_S3_SECRET_ACCESS_KEY (or AWS_*) in the environment",
            )?;
            check_endpoint_tls(storage)?;

            // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
            let builder = opendal::services::S3::default()
                .endpoint(&storage.endpoint)
                .region(&storage.region)
                .bucket(&storage.bucket)
                .access_key_id(&creds.access_key_id)
                .secret_access_key(creds.secret_access_key.expose_secret());

            Operator::new(builder)
                .context("creating OpenDAL S3 operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .layer(
                    opendal::layers::RetryLayer::new()
                        .with_max_times(3)
                        .with_jitter(),
                )
                .finish()
        }
    };

    Ok(op)
}

fn check_endpoint_tls(storage: &StorageConfig) -> Result<()> {
    if storage.endpoint.starts_with("http://") {
        if storage.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                storage.endpoint
            );
        }
        tracing::warn!(
            endpoint = %storage.endpoint,
            "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted. \
             Set storage.enforce_tls = true and use HTTPS in production."
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> S3Credentials {
        S3Credentials {
            access_key_id: "test-key".into(),
            secret_access_key: SecretString::from("test-secret"),
        }
    }

    #[test]
    fn test_build_memory_operator() {
        let storage = StorageConfig::default();
        assert!(build_operator(&storage, None).is_ok());
    }

    #[test]
    fn test_build_fs_operator() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            backend: BlobBackend::Fs,
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(build_operator(&storage, None).is_ok());
    }

    #[test]
    fn test_s3_requires_credentials() {
        let storage = StorageConfig {
            backend: BlobBackend::S3,
            ..Default::default()
        };
        let err = build_operator(&storage, None).unwrap_err();
        assert!(err.to_string().contains("CIPHARE_S3_ACCESS_KEY_ID"));
    }

    #[test]
    fn test_s3_http_warning() {
        // HTTP endpoint with enforce_tls=false should succeed (but log warning)
        let storage = StorageConfig {
            backend: BlobBackend::S3,
            endpoint: "http://localhost:9000".into(),
            enforce_tls: false,
            ..Default::default()
        };
        assert!(build_operator(&storage, Some(&creds())).is_ok());
    }

    #[test]
    fn test_s3_http_enforce_tls() {
        let storage = StorageConfig {
            backend: BlobBackend::S3,
            endpoint: "http://insecure:9000".into(),
            enforce_tls: true,
            ..Default::default()
        };
        let result = build_operator(&storage, Some(&creds()));
        assert!(result.is_err(), "HTTP + enforce_tls must fail");
        assert!(result.unwrap_err().to_string().contains("enforce_tls"));
    }

    #[test]
    fn test_s3_https() {
        let storage = StorageConfig {
            backend: BlobBackend::S3,
            endpoint: "https://acct.r2.cloudflarestorage.com".into(),
            enforce_tls: true,
            ..Default::default()
        };
        assert!(build_operator(&storage, Some(&creds())).is_ok());
    }
}
