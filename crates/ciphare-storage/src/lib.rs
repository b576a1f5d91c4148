//! ciphare-storage: the two collaborators the vault talks to
//!
//! - [`BlobStore`]: opaque ciphertext bytes by key. Backed by an OpenDAL
//!   operator (memory, local fs or any S3-compatible endpoint).
//! - [`MetadataStore`]: artifact records by id, with a uniqueness constraint
//!   on insert and an atomic "decrement only if positive" on read count.
//!   Backed by process memory or a JSON document, and bounded by a
//!   deadline through [`BoundedMetadataStore`].

pub mod blob;
pub mod bounded;
pub mod error;
pub mod health;
pub mod json;
pub mod memory;
pub mod metadata;
pub mod operator;

pub use blob::{BlobStore, OperatorBlobStore};
pub use bounded::BoundedMetadataStore;
pub use error::StorageError;
pub use health::check_health;
pub use json::JsonMetadataStore;
pub use memory::MemoryMetadataStore;
pub use metadata::MetadataStore;
pub use operator::{build_operator, S3Credentials};
