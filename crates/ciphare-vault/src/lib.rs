//! ciphare-vault: one-time secrets over password-based AEAD
//!
//! ```text
//!   submit ──> policy (clamp ttl/reads, cap name/type)
//!          ──> cipher.encrypt ──> BlobStore::put ──> MetadataStore::insert
//!
//!   retrieve ──> Lifecycle::lookup (lazy expiry)
//!            ──> BlobStore::get ──> cipher.decrypt
//!            ──> Lifecycle::consume_read ──> destroy on last read
//! ```
//!
//! Missing, expired and exhausted artifacts are all reported as
//! `NotFound`; every tag failure is `Authentication`.

pub mod lifecycle;
pub mod policy;
pub mod sweep;
pub mod vault;

pub use lifecycle::{check_accessible, ArtifactState, Lifecycle};
pub use sweep::spawn_sweeper;
pub use vault::{Retrieved, SubmitReceipt, SubmitRequest, Vault, VaultSettings, MAX_ID_ATTEMPTS};
