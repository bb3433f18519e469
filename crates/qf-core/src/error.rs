use thiserror::Error;

pub type QfResult<T> = Result<T, QfError>;

/// Failure reported by an object store backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    /// Network hiccup, throttling, 5xx. Worth retrying.
    #[error("transient storage error: {0}")]
    Transient(String),

    /// Permission denied, missing bucket, invalid configuration.
    #[error("storage error: {0}")]
    Fatal(String),
}

impl StoreError {
    /// True for failures the receiver treats as "try again" signals.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("decryption failed: wrong passphrase")]
    WrongPassphrase,

    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("cipher I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum QfError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("chunk {index} not found after {attempts} attempts; transfer incomplete or expired")]
    Protocol { index: u64, attempts: u32 },

    #[error("invalid transfer ID: {0}")]
    InvalidIdentifier(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
