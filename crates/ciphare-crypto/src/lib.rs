//! ciphare-crypto: password-based authenticated encryption for ciphare artifacts
//!
//! Pipeline for one artifact:
//! ```text
//! password ──┐
//! salt (16B random) ──► Argon2id ──► 256-bit key
//!                                      │
//! plaintext ─► AES-256-GCM(key, nonce=random 96-bit, AAD=id||name||type)
//!                                      │
//!                       ciphertext + detached 128-bit tag
//! ```
//!
//! Salt, nonce and tag are stored next to the ciphertext; none of them is
//! secret. Ciphers are looked up by name through [`AlgorithmRegistry`] so a
//! stored artifact keeps decrypting after new ciphers are added.

pub mod cipher;
pub mod encoding;
pub mod error;
pub mod id;
pub mod kdf;
pub mod registry;

pub use cipher::{associated_data, AeadCipher, Aes256GcmCipher, CipherAux, Sealed};
pub use ciphare_core::types::KdfParams;
pub use error::CryptoError;
pub use id::{generate_id, generate_token};
pub use kdf::{derive_key, DerivedKey};
pub use registry::AlgorithmRegistry;
pub use secrecy::SecretString;

/// Size of a derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of a freshly generated KDF salt
pub const SALT_SIZE: usize = 16;
