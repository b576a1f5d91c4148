//! Artifact metadata persistence

use async_trait::async_trait;
use ciphare_core::types::{ArtifactId, ArtifactRecord};

use crate::error::StorageError;

/// Keyed store of [`ArtifactRecord`]s.
///
/// `insert` must reject a duplicate id with [`StorageError::Conflict`].
/// `decrement_reads` must be atomic with respect to concurrent callers on
/// the same id: of N concurrent calls against a record with `k` reads left,
/// exactly `min(N, k)` succeed.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn insert(&self, record: ArtifactRecord) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &ArtifactId) -> Result<Option<ArtifactRecord>, StorageError>;

    /// Decrement `reads_remaining` if it is above zero.
    ///
    /// Returns the post-decrement value, or `None` if the record is missing
    /// or already at zero.
    async fn decrement_reads(&self, id: &ArtifactId) -> Result<Option<u32>, StorageError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &ArtifactId) -> Result<bool, StorageError>;

    /// Records with `expires_at < before`.
    async fn find_expired(&self, before: u64) -> Result<Vec<ArtifactRecord>, StorageError>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize, StorageError>;
}

/// Shared decrement rule for the in-process stores.
pub(crate) fn take_read(record: &mut ArtifactRecord) -> Option<u32> {
    if record.reads_remaining == 0 {
        return None;
    }
    record.reads_remaining -= 1;
    Some(record.reads_remaining)
}
