//! JSON-file metadata store
//!
//! The whole record set lives in memory behind one lock and is rewritten to
//! disk on every mutation (write to `<path>.tmp`, then rename). A failed
//! write rolls the in-memory change back so memory never runs ahead of disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ciphare_core::types::{ArtifactId, ArtifactRecord};
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::metadata::{take_read, MetadataStore};

type Records = BTreeMap<ArtifactId, ArtifactRecord>;

#[derive(Debug)]
pub struct JsonMetadataStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl JsonMetadataStore {
    /// Open the store at `path`, loading existing records if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Records::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Records::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), records = records.len(), "loaded metadata store");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, records: &Records) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(records)?;

        // Atomic write: write to temp file, then rename
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn insert(&self, record: ArtifactRecord) -> Result<(), StorageError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(StorageError::Conflict(record.id.to_string()));
        }
        let id = record.id.clone();
        records.insert(id.clone(), record);
        if let Err(e) = self.flush(&records).await {
            records.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ArtifactId) -> Result<Option<ArtifactRecord>, StorageError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn decrement_reads(&self, id: &ArtifactId) -> Result<Option<u32>, StorageError> {
        let mut records = self.records.lock().await;
        let Some(remaining) = records.get_mut(id).and_then(take_read) else {
            return Ok(None);
        };
        if let Err(e) = self.flush(&records).await {
            if let Some(r) = records.get_mut(id) {
                r.reads_remaining += 1;
            }
            return Err(e);
        }
        Ok(Some(remaining))
    }

    async fn delete(&self, id: &ArtifactId) -> Result<bool, StorageError> {
        let mut records = self.records.lock().await;
        let Some(removed) = records.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.flush(&records).await {
            records.insert(id.clone(), removed);
            return Err(e);
        }
        Ok(true)
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
