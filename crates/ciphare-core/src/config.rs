use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CiphareError, CiphareResult};
use crate::types::KdfParams;

/// Lowest Argon2id memory cost a config file may ask for (19 MiB).
pub const MIN_ARGON2_MEM_COST_KIB: u32 = 19456;
/// Lowest Argon2id pass count a config file may ask for.
pub const MIN_ARGON2_TIME_COST: u32 = 2;

/// Top-level service configuration (loaded from ciphare.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CiphareConfig {
    pub daemon: DaemonConfig,
    pub storage: StorageConfig,
    pub metadata: MetadataConfig,
    pub crypto: CryptoConfig,
    pub limits: LimitsConfig,
    pub sweep: SweepConfig,
}

impl CiphareConfig {
    /// Reject configurations that would weaken the service or can never work.
    pub fn validate(&self) -> CiphareResult<()> {
        self.crypto.validate()?;
        self.limits.validate()?;
        if self.storage.timeout_secs == 0 {
            return Err(CiphareError::Config(
                "storage.timeout_secs must be at least 1".into(),
            ));
        }
        if self.sweep.enabled && self.sweep.interval_secs == 0 {
            return Err(CiphareError::Config(
                "sweep.interval_secs must be at least 1 when the sweeper is enabled".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// HTTP API listen address (default: 127.0.0.1:8080)
    pub listen: String,
    /// Prometheus metrics endpoint (default: 127.0.0.1:9100)
    pub metrics_addr: Option<String>,
    /// Base URL used to build share links
    pub public_url: String,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".into(),
            metrics_addr: Some("127.0.0.1:9100".into()),
            public_url: "http://localhost:8080".into(),
            log_level: "info".into(),
            log_format: "json".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Process memory, lost on restart
    Memory,
    /// Local directory under `root`
    Fs,
    /// Any S3-compatible endpoint (R2, SeaweedFS, MinIO, ...)
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BlobBackend,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: auto)
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Object key prefix for ciphertext blobs
    pub prefix: String,
    /// Enforce HTTPS for S3 connections (warn/error on HTTP endpoints)
    pub enforce_tls: bool,
    /// Upper bound on a single blob or metadata call, in seconds
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Memory,
            endpoint: "http://localhost:9000".into(),
            region: "auto".into(),
            bucket: "ciphare".into(),
            root: PathBuf::from("/var/lib/ciphare/blobs"),
            prefix: "encrypted".into(),
            enforce_tls: false,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    Memory,
    /// Single JSON document, rewritten atomically on every mutation
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    /// Path of the JSON document for the json backend
    pub path: PathBuf,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::Memory,
            path: PathBuf::from("/var/lib/ciphare/artifacts.json"),
        }
    }
}

/// Encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Algorithm used when a submit request names none
    pub default_algorithm: String,
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (passes, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        let kdf = KdfParams::default();
        Self {
            default_algorithm: "AES256".into(),
            argon2_mem_cost_kib: kdf.mem_cost_kib,
            argon2_time_cost: kdf.time_cost,
            argon2_parallelism: kdf.parallelism,
        }
    }
}

impl CryptoConfig {
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            mem_cost_kib: self.argon2_mem_cost_kib,
            time_cost: self.argon2_time_cost,
            parallelism: self.argon2_parallelism,
        }
    }

    fn validate(&self) -> CiphareResult<()> {
        if self.argon2_mem_cost_kib < MIN_ARGON2_MEM_COST_KIB {
            return Err(CiphareError::Config(format!(
                "crypto.argon2_mem_cost_kib = {} is below the minimum of {}",
                self.argon2_mem_cost_kib, MIN_ARGON2_MEM_COST_KIB
            )));
        }
        if self.argon2_time_cost < MIN_ARGON2_TIME_COST {
            return Err(CiphareError::Config(format!(
                "crypto.argon2_time_cost = {} is below the minimum of {}",
                self.argon2_time_cost, MIN_ARGON2_TIME_COST
            )));
        }
        if self.argon2_parallelism == 0 {
            return Err(CiphareError::Config(
                "crypto.argon2_parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Bounds applied to caller input. Out-of-range TTL and read counts are
/// clamped, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted plaintext (default: 500 MiB)
    pub max_payload_bytes: u64,
    pub min_ttl_secs: u64,
    pub max_ttl_secs: u64,
    pub default_ttl_secs: u64,
    pub min_reads: u32,
    pub max_reads: u32,
    pub default_reads: u32,
    /// In characters
    pub max_file_name_len: usize,
    /// In characters
    pub max_file_type_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 500 * 1024 * 1024,
            min_ttl_secs: 60,
            max_ttl_secs: 90 * 86400,
            default_ttl_secs: 60,
            min_reads: 1,
            max_reads: 100,
            default_reads: 1,
            max_file_name_len: 255,
            max_file_type_len: 100,
        }
    }
}

impl LimitsConfig {
    fn validate(&self) -> CiphareResult<()> {
        if self.min_ttl_secs == 0 || self.min_ttl_secs > self.max_ttl_secs {
            return Err(CiphareError::Config(format!(
                "limits: invalid TTL range {}..={}",
                self.min_ttl_secs, self.max_ttl_secs
            )));
        }
        if self.min_reads == 0 || self.min_reads > self.max_reads {
            return Err(CiphareError::Config(format!(
                "limits: invalid read range {}..={}",
                self.min_reads, self.max_reads
            )));
        }
        if self.max_payload_bytes == 0 {
            return Err(CiphareError::Config(
                "limits.max_payload_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Background deletion of expired artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[daemon]
listen = "0.0.0.0:8443"
public_url = "https://share.example.com"
log_level = "debug"
log_format = "text"

[storage]
backend = "s3"
endpoint = "https://acct.r2.cloudflarestorage.com"
region = "auto"
bucket = "secrets"
enforce_tls = true
timeout_secs = 5

[metadata]
backend = "json"
path = "/tmp/ciphare.json"

[crypto]
default_algorithm = "aes256"
argon2_mem_cost_kib = 131072
argon2_time_cost = 4
argon2_parallelism = 8

[limits]
max_payload_bytes = 1048576
max_reads = 10

[sweep]
enabled = false
"#;
        let config: CiphareConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.daemon.listen, "0.0.0.0:8443");
        assert_eq!(config.daemon.public_url, "https://share.example.com");
        assert_eq!(config.storage.backend, BlobBackend::S3);
        assert!(config.storage.enforce_tls);
        assert_eq!(config.storage.timeout_secs, 5);
        assert_eq!(config.metadata.backend, MetadataBackend::Json);
        assert_eq!(config.crypto.kdf_params().mem_cost_kib, 131072);
        assert_eq!(config.limits.max_reads, 10);
        assert_eq!(config.limits.min_reads, 1);
        assert!(!config.sweep.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config: CiphareConfig = toml::from_str("").unwrap();

        assert_eq!(config.storage.backend, BlobBackend::Memory);
        assert_eq!(config.storage.prefix, "encrypted");
        assert_eq!(config.metadata.backend, MetadataBackend::Memory);
        assert_eq!(config.crypto.default_algorithm, "AES256");
        assert_eq!(config.crypto.kdf_params(), KdfParams::default());
        assert_eq!(config.limits.min_ttl_secs, 60);
        assert_eq!(config.limits.max_ttl_secs, 90 * 86400);
        assert_eq!(config.limits.max_payload_bytes, 500 * 1024 * 1024);
        assert!(config.sweep.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_weak_kdf_rejected() {
        let mut config = CiphareConfig::default();
        config.crypto.argon2_mem_cost_kib = 1024;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("argon2_mem_cost_kib"));

        let mut config = CiphareConfig::default();
        config.crypto.argon2_time_cost = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let mut config = CiphareConfig::default();
        config.limits.min_ttl_secs = 100;
        config.limits.max_ttl_secs = 10;
        assert!(config.validate().is_err());

        let mut config = CiphareConfig::default();
        config.limits.min_reads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = CiphareConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: CiphareConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.daemon.listen, parsed.daemon.listen);
        assert_eq!(config.storage.backend, parsed.storage.backend);
        assert_eq!(config.metadata.path, parsed.metadata.path);
    }
}
