//! ciphare-core: shared types, config schema and the outward error taxonomy
//! for the ciphare one-time secret service.

pub mod config;
pub mod error;
pub mod types;

pub use error::{CiphareError, CiphareResult};
pub use types::{unix_now, ArtifactId, ArtifactRecord};
