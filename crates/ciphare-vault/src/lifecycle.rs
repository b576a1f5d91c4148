//! Read-count and TTL lifecycle of a stored artifact
//!
//! ```text
//! ACTIVE (reads > 0, now <= expires_at)
//!   ├─ last read consumed ──> EXHAUSTED ─┐
//!   └─ now > expires_at ────> EXPIRED ───┴─> DELETED
//! ```
//!
//! Callers only ever see ACTIVE or "not found". EXHAUSTED and EXPIRED
//! records are destroyed as soon as they are noticed.

use std::sync::Arc;

use ciphare_core::types::{ArtifactId, ArtifactRecord};
use ciphare_core::{CiphareError, CiphareResult};
use ciphare_storage::{BlobStore, MetadataStore};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Active,
    Exhausted,
    Expired,
}

impl ArtifactState {
    /// Expiry wins over exhaustion.
    pub fn of(record: &ArtifactRecord, now: u64) -> Self {
        if record.is_expired(now) {
            ArtifactState::Expired
        } else if record.is_exhausted() {
            ArtifactState::Exhausted
        } else {
            ArtifactState::Active
        }
    }
}

pub fn check_accessible(record: &ArtifactRecord, now: u64) -> bool {
    ArtifactState::of(record, now) == ArtifactState::Active
}

/// Owns deletion: every path that removes an artifact goes through
/// [`Lifecycle::destroy`].
#[derive(Clone)]
pub struct Lifecycle {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl Lifecycle {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { blobs, metadata }
    }

    /// Fetch an ACTIVE record. Anything else is destroyed (if present) and
    /// reported as [`CiphareError::NotFound`].
    pub async fn lookup(&self, id: &ArtifactId, now: u64) -> CiphareResult<ArtifactRecord> {
        let record = self
            .metadata
            .find_by_id(id)
            .await?
            .ok_or(CiphareError::NotFound)?;

        match ArtifactState::of(&record, now) {
            ArtifactState::Active => Ok(record),
            state => {
                debug!(id = %id, ?state, "artifact no longer accessible");
                self.destroy(&record).await;
                Err(CiphareError::NotFound)
            }
        }
    }

    /// Atomically take one read. Returns the reads left afterwards; the
    /// caller that takes the last one destroys the artifact.
    ///
    /// Losing a race for the last read is [`CiphareError::NotFound`].
    pub async fn consume_read(&self, record: &ArtifactRecord) -> CiphareResult<u32> {
        let remaining = self
            .metadata
            .decrement_reads(&record.id)
            .await?
            .ok_or(CiphareError::NotFound)?;

        if remaining == 0 {
            info!(id = %record.id, "last read consumed, destroying artifact");
            self.destroy(record).await;
        }
        Ok(remaining)
    }

    /// Remove the blob, then the metadata. Returns true only if both are
    /// gone.
    ///
    /// A failed blob delete keeps the record so the next lookup or sweep
    /// retries the whole removal; the blob is never left without a record
    /// pointing at it.
    pub async fn destroy(&self, record: &ArtifactRecord) -> bool {
        if let Err(e) = self.blobs.delete(&record.blob_key).await {
            error!(
                id = %record.id,
                blob_key = %record.blob_key,
                "ciphertext delete failed, keeping record for retry: {e}"
            );
            return false;
        }

        match self.metadata.delete(&record.id).await {
            Ok(_) => {
                debug!(id = %record.id, "artifact destroyed");
                true
            }
            Err(e) => {
                warn!(id = %record.id, "blob removed but metadata delete failed: {e}");
                false
            }
        }
    }

    /// Destroy every record with `expires_at < now`. Returns how many were
    /// fully removed.
    pub async fn sweep_expired(&self, now: u64) -> CiphareResult<usize> {
        let expired = self.metadata.find_expired(now).await?;
        if expired.is_empty() {
            return Ok(0);
        }

        let mut destroyed = 0;
        for record in &expired {
            if self.destroy(record).await {
                destroyed += 1;
            }
        }
        info!(found = expired.len(), destroyed, "expired artifacts swept");
        Ok(destroyed)
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }
}
