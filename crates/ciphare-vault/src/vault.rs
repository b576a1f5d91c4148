//! Submit and retrieve
//!
//! Submit: validate → clamp → generate id → encrypt (id, name and type bound
//! as associated data) → put blob → insert metadata. Metadata is never
//! written before the blob, and a failed insert removes the blob again.
//!
//! Retrieve: lookup (lazy expiry) → fetch blob → decrypt → consume one read.
//! A failed decryption never consumes a read.

use std::sync::Arc;

use ciphare_core::config::{CiphareConfig, LimitsConfig};
use ciphare_core::types::{unix_now, ArtifactId, ArtifactRecord};
use ciphare_core::{CiphareError, CiphareResult};
use ciphare_crypto::encoding;
use ciphare_crypto::{
    associated_data, generate_id, generate_token, AeadCipher, AlgorithmRegistry, CipherAux, Sealed,
};
use ciphare_storage::{BlobStore, MetadataStore, StorageError};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::lifecycle::Lifecycle;
use crate::policy;

/// How many fresh ids submit tries before giving up on a uniqueness conflict.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Deployment settings the vault needs from config.
#[derive(Debug, Clone)]
pub struct VaultSettings {
    /// Base of share links, without a trailing slash.
    pub public_url: String,
    /// Blob key prefix.
    pub prefix: String,
    pub default_algorithm: String,
    pub limits: LimitsConfig,
}

impl VaultSettings {
    pub fn from_config(config: &CiphareConfig) -> Self {
        Self {
            public_url: config.daemon.public_url.trim_end_matches('/').to_string(),
            prefix: config.storage.prefix.trim_matches('/').to_string(),
            default_algorithm: config.crypto.default_algorithm.clone(),
            limits: config.limits.clone(),
        }
    }
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self::from_config(&CiphareConfig::default())
    }
}

/// A payload to store. Everything except `plaintext` and `password` is
/// optional and normalized by [`policy`].
pub struct SubmitRequest {
    pub plaintext: Zeroizing<Vec<u8>>,
    pub password: SecretString,
    pub ttl_secs: Option<i64>,
    pub max_reads: Option<i64>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub algorithm: Option<String>,
}

impl SubmitRequest {
    pub fn new(plaintext: impl Into<Vec<u8>>, password: impl Into<String>) -> Self {
        Self {
            plaintext: Zeroizing::new(plaintext.into()),
            password: SecretString::from(password.into()),
            ttl_secs: None,
            max_reads: None,
            file_name: None,
            file_type: None,
            algorithm: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub id: ArtifactId,
    pub share_link: String,
}

pub struct Retrieved {
    pub plaintext: Zeroizing<Vec<u8>>,
    pub file_name: String,
    pub file_type: String,
    pub remaining_reads: u32,
}

impl std::fmt::Debug for Retrieved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrieved")
            .field("plaintext", &format_args!("[{} bytes]", self.plaintext.len()))
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .field("remaining_reads", &self.remaining_reads)
            .finish()
    }
}

/// The one-time-secret service. Cheap to clone; all state lives in the
/// stores.
#[derive(Clone)]
pub struct Vault {
    registry: Arc<AlgorithmRegistry>,
    lifecycle: Lifecycle,
    settings: Arc<VaultSettings>,
}

impl Vault {
    pub fn new(
        registry: Arc<AlgorithmRegistry>,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        settings: VaultSettings,
    ) -> Self {
        Self {
            registry,
            lifecycle: Lifecycle::new(blobs, metadata),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn share_link(&self, id: &ArtifactId) -> String {
        format!("{}/decode?id={}", self.settings.public_url, id)
    }

    pub async fn submit(&self, request: SubmitRequest) -> CiphareResult<SubmitReceipt> {
        self.submit_at(request, unix_now()).await
    }

    pub async fn submit_at(&self, request: SubmitRequest, now: u64) -> CiphareResult<SubmitReceipt> {
        let limits = &self.settings.limits;

        if request.password.expose_secret().is_empty() {
            return Err(CiphareError::Validation("password is required".into()));
        }
        if request.plaintext.is_empty() {
            return Err(CiphareError::Validation("file data is required".into()));
        }
        let size = request.plaintext.len() as u64;
        if size > limits.max_payload_bytes {
            return Err(CiphareError::Validation(format!(
                "payload of {size} bytes exceeds the {} byte limit",
                limits.max_payload_bytes
            )));
        }

        let algorithm = request
            .algorithm
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(&self.settings.default_algorithm);
        let (algorithm, cipher) = self.registry.resolve(algorithm)?;

        let ttl = policy::clamp_ttl(request.ttl_secs, limits);
        let reads = policy::clamp_reads(request.max_reads, limits);
        let file_name = policy::file_name(request.file_name.as_deref(), limits);
        let file_type = policy::file_type(request.file_type.as_deref(), limits);

        let plaintext = Arc::new(request.plaintext);
        let password = Arc::new(request.password);

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = generate_id();
            let blob_key = self.blob_key(&id);
            let aad = associated_data(&[id.as_str(), &file_name, &file_type]);

            let sealed = seal(
                Arc::clone(&cipher),
                Arc::clone(&plaintext),
                Arc::clone(&password),
                aad,
            )
            .await?;
            let Sealed {
                ciphertext,
                nonce,
                salt,
                tag,
                kdf,
            } = sealed;

            self.lifecycle.blobs().put(&blob_key, ciphertext).await?;

            let record = ArtifactRecord {
                id: id.clone(),
                blob_key: blob_key.clone(),
                algorithm: algorithm.clone(),
                nonce: encoding::encode(&nonce),
                salt: encoding::encode(&salt),
                tag: encoding::encode(&tag),
                kdf,
                reads_remaining: reads,
                created_at: now,
                expires_at: now.saturating_add(ttl),
                file_name: file_name.clone(),
                file_type: file_type.clone(),
                size,
            };

            match self.lifecycle.metadata().insert(record).await {
                Ok(()) => {
                    info!(
                        id = %id,
                        algorithm = %algorithm,
                        bytes = size,
                        ttl_secs = ttl,
                        reads,
                        "artifact stored"
                    );
                    let share_link = self.share_link(&id);
                    return Ok(SubmitReceipt { id, share_link });
                }
                Err(StorageError::Conflict(_)) => {
                    warn!(attempt, "artifact id already taken, regenerating");
                    self.discard_blob(&blob_key).await;
                }
                Err(e) => {
                    self.discard_blob(&blob_key).await;
                    return Err(e.into());
                }
            }
        }

        Err(CiphareError::storage(format!(
            "no unique artifact id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    pub async fn retrieve(&self, id: &str, password: SecretString) -> CiphareResult<Retrieved> {
        self.retrieve_at(id, password, unix_now()).await
    }

    pub async fn retrieve_at(
        &self,
        id: &str,
        password: SecretString,
        now: u64,
    ) -> CiphareResult<Retrieved> {
        let id = ArtifactId::parse(id.trim()).ok_or(CiphareError::NotFound)?;
        let record = self.lifecycle.lookup(&id, now).await?;

        // A stored name the registry no longer knows is a server fault, not
        // a bad request.
        let cipher = self.registry.get(&record.algorithm).map_err(|_| {
            error!(id = %id, algorithm = %record.algorithm, "stored artifact names unregistered algorithm");
            CiphareError::Other(anyhow::anyhow!(
                "artifact stored under unregistered algorithm '{}'",
                record.algorithm
            ))
        })?;
        let aux = CipherAux {
            nonce: encoding::decode_field("nonce", &record.nonce)?,
            salt: encoding::decode_field("salt", &record.salt)?,
            tag: encoding::decode_field("tag", &record.tag)?,
            kdf: record.kdf,
        };

        let Some(ciphertext) = self.lifecycle.blobs().get(&record.blob_key).await? else {
            error!(id = %id, blob_key = %record.blob_key, "metadata present but ciphertext missing");
            self.lifecycle.destroy(&record).await;
            return Err(CiphareError::NotFound);
        };

        let aad = associated_data(&[id.as_str(), &record.file_name, &record.file_type]);
        let plaintext = match open(cipher, ciphertext, password, aux, aad).await {
            Ok(p) => p,
            Err(CiphareError::Authentication) => {
                info!(id = %id, "decryption failed, read not consumed");
                return Err(CiphareError::Authentication);
            }
            Err(e) => return Err(e),
        };

        let remaining_reads = self.lifecycle.consume_read(&record).await?;
        debug!(id = %id, remaining_reads, "artifact read");

        Ok(Retrieved {
            plaintext,
            file_name: record.file_name,
            file_type: record.file_type,
            remaining_reads,
        })
    }

    /// Destroy every artifact whose TTL has elapsed by `now`.
    pub async fn sweep_expired(&self, now: u64) -> CiphareResult<usize> {
        self.lifecycle.sweep_expired(now).await
    }

    fn blob_key(&self, id: &ArtifactId) -> String {
        let token = generate_token();
        if self.settings.prefix.is_empty() {
            format!("{id}-{token}.bin")
        } else {
            format!("{}/{id}-{token}.bin", self.settings.prefix)
        }
    }

    async fn discard_blob(&self, blob_key: &str) {
        if let Err(e) = self.lifecycle.blobs().delete(blob_key).await {
            error!(blob_key, "failed to clean up ciphertext after aborted submit: {e}");
        }
    }
}

/// Run the KDF and encryption off the async workers.
async fn seal(
    cipher: Arc<dyn AeadCipher>,
    plaintext: Arc<Zeroizing<Vec<u8>>>,
    password: Arc<SecretString>,
    aad: Vec<u8>,
) -> CiphareResult<Sealed> {
    tokio::task::spawn_blocking(move || cipher.encrypt(&plaintext, &password, &aad))
        .await
        .map_err(|e| CiphareError::Other(anyhow::anyhow!("encryption task failed: {e}")))?
        .map_err(CiphareError::from)
}

async fn open(
    cipher: Arc<dyn AeadCipher>,
    ciphertext: Vec<u8>,
    password: SecretString,
    aux: CipherAux,
    aad: Vec<u8>,
) -> CiphareResult<Zeroizing<Vec<u8>>> {
    tokio::task::spawn_blocking(move || cipher.decrypt(&ciphertext, &password, &aux, &aad))
        .await
        .map_err(|e| CiphareError::Other(anyhow::anyhow!("decryption task failed: {e}")))?
        .map_err(CiphareError::from)
}
