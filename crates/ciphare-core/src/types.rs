use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest identifier accepted from a client before any storage lookup.
pub const MAX_ID_LEN: usize = 64;

/// Current wall-clock time as Unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Public identifier of a stored artifact.
///
/// This is a capability token: together with the password it is the only
/// thing needed to read an artifact, so it is always random (see
/// `ciphare_crypto::id`) and never derived from content or time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap a freshly generated identifier. Callers outside the generator
    /// should go through [`ArtifactId::parse`].
    pub fn new_unchecked(id: String) -> Self {
        ArtifactId(id)
    }

    /// Accept an identifier supplied by a client.
    ///
    /// Only the URL-safe base64 alphabet is allowed; anything else cannot have
    /// been generated by us and is rejected without touching storage.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > MAX_ID_LEN {
            return None;
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return None;
        }
        Some(ArtifactId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Argon2id cost parameters, recorded per artifact so the defaults can be
/// raised later without stranding older artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / passes (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// The persisted metadata of one encrypted artifact.
///
/// Binary fields (`nonce`, `salt`, `tag`) are kept as standard base64 text,
/// the same encoding used on the wire. The ciphertext itself lives in the
/// blob store under `blob_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub blob_key: String,
    /// Registry name of the cipher that sealed this artifact
    pub algorithm: String,
    pub nonce: String,
    pub salt: String,
    pub tag: String,
    pub kdf: KdfParams,
    pub reads_remaining: u32,
    /// Unix seconds
    pub created_at: u64,
    /// Unix seconds; the artifact is gone once `now > expires_at`
    pub expires_at: u64,
    /// Display only, attacker controlled, already length capped
    pub file_name: String,
    /// Display only, attacker controlled, already length capped
    pub file_type: String,
    /// Ciphertext length in bytes
    pub size: u64,
}

impl ArtifactRecord {
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.reads_remaining == 0
    }
}
