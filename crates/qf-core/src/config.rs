use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QfError, QfResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QfConfig {
    pub storage: StorageConfig,
    pub transfer: TransferConfig,
    pub crypto: CryptoConfig,
    pub log: LogConfig,
}

/// Which OpenDAL service backs the object store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Gcs,
    /// Process-local memory; only useful for tests and dry runs
    Memory,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Bucket shared by sender and receiver
    pub bucket: String,
    /// S3 endpoint; empty means the AWS default for `region`
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Base64-encoded GCS service account JSON
    pub google_credentials: String,
    /// Reject plaintext HTTP endpoints instead of warning
    pub enforce_tls: bool,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("google_credentials", &redact(&self.google_credentials))
            .field("enforce_tls", &self.enforce_tls)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Literal prefix separating qf objects from unrelated bucket contents
    pub prefix: String,
    /// Size bound of chunk 1, kept small so the receiver sees data quickly
    pub first_chunk_size: usize,
    /// Size bound of every later chunk
    pub chunk_size: usize,
    pub object_key_length: usize,
    pub cipher_key_length: usize,
    /// Leave chunks in the bucket after a successful receive
    pub keep: bool,
    /// Consecutive failed lookups at one index before the receiver gives up
    pub failure_budget: u32,
    /// Linear backoff step: the n-th consecutive failure sleeps n * interval
    pub backoff_interval_secs: u64,
}

/// Chunk cipher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// scrypt log2(N) for encryption; unset lets age calibrate (~1s)
    pub scrypt_work_factor: Option<u8>,
    /// Highest scrypt log2(N) accepted when decrypting
    pub max_work_factor: u8,
    /// zstd level applied before encryption
    pub compression_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            bucket: "qf".into(),
            endpoint: String::new(),
            region: "us-east-1".into(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            google_credentials: String::new(),
            enforce_tls: false,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            prefix: "qf".into(),
            first_chunk_size: 1024 * 1024,
            chunk_size: 5 * 1024 * 1024,
            object_key_length: 2,
            cipher_key_length: 10,
            keep: false,
            failure_budget: 10,
            backoff_interval_secs: 3,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            scrypt_work_factor: None,
            max_work_factor: 22,
            compression_level: 1,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl QfConfig {
    /// Load from a TOML file, falling back to defaults when it doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))
    }

    /// Reject values the transfer pipeline cannot work with.
    pub fn validate(&self) -> QfResult<()> {
        let t = &self.transfer;
        if t.first_chunk_size == 0 || t.chunk_size == 0 {
            return Err(QfError::Config("chunk sizes must be non-zero".into()));
        }
        if t.object_key_length == 0 || t.cipher_key_length == 0 {
            return Err(QfError::Config("key lengths must be non-zero".into()));
        }
        if t.failure_budget == 0 {
            return Err(QfError::Config("failure_budget must be at least 1".into()));
        }
        if t.prefix.is_empty() || t.prefix.contains('_') {
            return Err(QfError::Config(format!(
                "prefix must be non-empty and contain no '_': {:?}",
                t.prefix
            )));
        }
        if self.storage.bucket.is_empty() && self.storage.backend != StorageBackend::Memory {
            return Err(QfError::Config("storage.bucket is not set".into()));
        }
        Ok(())
    }
}
