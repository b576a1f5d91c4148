//! Ciphertext blob storage

use async_trait::async_trait;
use opendal::{ErrorKind, Operator};
use std::future::Future;
use std::time::Duration;

use crate::error::StorageError;

/// Opaque bytes by key. `delete` of a missing key is not an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Cheap reachability probe for readiness checks.
    async fn check_health(&self) -> Result<(), StorageError>;
}

/// [`BlobStore`] over an OpenDAL operator, with every call bounded by
/// `timeout`.
#[derive(Debug, Clone)]
pub struct OperatorBlobStore {
    op: Operator,
    timeout: Duration,
}

impl OperatorBlobStore {
    pub fn new(op: Operator, timeout: Duration) -> Self {
        Self { op, timeout }
    }

    /// In-memory store, mostly for tests and throwaway deployments.
    pub fn memory(timeout: Duration) -> Result<Self, StorageError> {
        let op = Operator::new(opendal::services::Memory::default())?.finish();
        Ok(Self::new(op, timeout))
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    async fn bounded<T, F>(&self, what: &str, key: &str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = opendal::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StorageError::from),
            Err(_) => Err(StorageError::Timeout(format!(
                "{what} {key} after {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

#[async_trait]
impl BlobStore for OperatorBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let len = data.len();
        self.bounded("put", key, self.op.write(key, data)).await?;
        tracing::debug!(key, bytes = len, "blob stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let read = tokio::time::timeout(self.timeout, self.op.read(key)).await;
        match read {
            Ok(Ok(buf)) => Ok(Some(buf.to_vec())),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StorageError::Timeout(format!(
                "get {key} after {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.bounded("delete", key, self.op.delete(key)).await?;
        tracing::debug!(key, "blob deleted");
        Ok(())
    }

    async fn check_health(&self) -> Result<(), StorageError> {
        self.bounded("list", "/", crate::health::check_health(&self.op))
            .await
    }
}
