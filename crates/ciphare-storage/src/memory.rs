//! In-process metadata store

use std::collections::HashMap;

use async_trait::async_trait;
use ciphare_core::types::{ArtifactId, ArtifactRecord};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::metadata::{take_read, MetadataStore};

/// [`MetadataStore`] held entirely in memory. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: Mutex<HashMap<ArtifactId, ArtifactRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: ArtifactRecord) -> Result<(), StorageError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(StorageError::Conflict(record.id.to_string()));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn find_by_id(&self, id: &ArtifactId) -> Result<Option<ArtifactRecord>, StorageError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn decrement_reads(&self, id: &ArtifactId) -> Result<Option<u32>, StorageError> {
        Ok(self.records.lock().await.get_mut(id).and_then(take_read))
    }

    async fn delete(&self, id: &ArtifactId) -> Result<bool, StorageError> {
        Ok(self.records.lock().await.remove(id).is_some())
    }

    async fn find_expired(&self, before: u64) -> Result<Vec<ArtifactRecord>, StorageError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.expires_at < before)
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<usize, StorageError> {
        Ok(self.records.lock().await.len())
    }
}
