//! Timeout wrapper for metadata stores
//!
//! Each call runs on its own task, so a caller that gives up at the deadline
//! never cancels a write halfway through; the store finishes it and the
//! caller sees a retryable [`StorageError::Timeout`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ciphare_core::types::{ArtifactId, ArtifactRecord};

use crate::error::StorageError;
use crate::metadata::MetadataStore;

#[derive(Clone)]
pub struct BoundedMetadataStore {
    inner: Arc<dyn MetadataStore>,
    timeout: Duration,
}

impl BoundedMetadataStore {
    pub fn new(inner: Arc<dyn MetadataStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, what: &str, key: &str, fut: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, StorageError>> + Send + 'static,
    {
        let task = tokio::spawn(fut);
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(StorageError::Backend {
                message: format!("metadata {what} {key} aborted: {e}"),
                temporary: false,
            }),
            Err(_) => Err(StorageError::Timeout(format!(
                "metadata {what} {key} after {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

#[async_trait]
impl MetadataStore for BoundedMetadataStore {
    async fn insert(&self, record: ArtifactRecord) -> Result<(), StorageError> {
        let inner = Arc::clone(&self.inner);
        let key = record.id.to_string();
        self.bounded("insert", &key, async move { inner.insert(record).await })
            .await
    }

    async fn find_by_id(&self, id: &ArtifactId) -> Result<Option<ArtifactRecord>, StorageError> {
        let inner = Arc::clone(&self.inner);
        let owned = id.clone();
        self.bounded("find", id.as_str(), async move { inner.find_by_id(&owned).await })
            .await
    }

    async fn decrement_reads(&self, id: &ArtifactId) -> Result<Option<u32>, StorageError> {
        let inner = Arc::clone(&self.inner);
        let owned = id.clone();
        self.bounded("decrement", id.as_str(), async move {
            inner.decrement_reads(&owned).await
        })
        .await
    }

    async fn delete(&self, id: &ArtifactId) -> Result<bool, StorageError> {
        let inner = Arc::clone(&self.inner);
        let owned = id.clone();
        self.bounded("delete", id.as_str(), async move { inner.delete(&owned).await })
            .await
    }

    async fn find_expired(&self, before: u64) -> Result<Vec<ArtifactRecord>, StorageError> {
        let inner = Arc::clone(&self.inner);
        self.bounded("scan", "expired", async move { inner.find_expired(before).await })
            .await
    }

    async fn len(&self) -> Result<usize, StorageError> {
        let inner = Arc::clone(&self.inner);
        self.bounded("count", "*", async move { inner.len().await })
            .await
    }
}
