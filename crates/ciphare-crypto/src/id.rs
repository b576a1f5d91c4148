//! Artifact identifier generation
//!
//! An identifier is 128 random bits rendered as unpadded URL-safe base64
//! (22 characters). It carries no timestamp, counter or content hash, so it
//! reveals nothing about creation order and cannot be enumerated.
//! Uniqueness is enforced by the metadata store on insert.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciphare_core::ArtifactId;
use rand::RngCore;

/// Entropy of a generated identifier in bytes.
pub const ID_BYTES: usize = 16;

/// Entropy of a blob key token in bytes.
pub const TOKEN_BYTES: usize = 8;

/// Generate a fresh, unguessable artifact identifier.
///
/// Panics only if the OS randomness source fails, which is unrecoverable.
pub fn generate_id() -> ArtifactId {
    ArtifactId::new_unchecked(random_b64(ID_BYTES))
}

/// Generate a short random token, used to make blob keys unique per write.
pub fn generate_token() -> String {
    random_b64(TOKEN_BYTES)
}

fn random_b64(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(&bytes)
}
