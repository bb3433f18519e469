//! Streaming chunk cipher: zstd compress, then age passphrase encryption

use std::io::{Read, Write};

use qf_core::config::CryptoConfig;
use qf_core::CryptoError;
use secrecy::{ExposeSecret, SecretString};

/// Symmetric, passphrase-keyed encryption of one chunk.
///
/// `decrypt` makes exactly one passphrase attempt and fails with
/// `CryptoError` on a wrong passphrase or malformed input.
pub trait ChunkCipher: Send + Sync {
    /// Returns the number of plaintext bytes consumed.
    fn encrypt(
        &self,
        passphrase: &SecretString,
        plaintext: &mut dyn Read,
        ciphertext: &mut dyn Write,
    ) -> Result<u64, CryptoError>;

    /// Returns the number of plaintext bytes produced.
    fn decrypt(
        &self,
        passphrase: &SecretString,
        ciphertext: &mut dyn Read,
        plaintext: &mut dyn Write,
    ) -> Result<u64, CryptoError>;

    /// Encrypt an in-memory buffer.
    fn seal(&self, passphrase: &SecretString, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = Vec::with_capacity(plaintext.len() / 2 + 256);
        self.encrypt(passphrase, &mut &plaintext[..], &mut out)?;
        Ok(out)
    }

    /// Decrypt an in-memory buffer. Nothing is returned unless the whole
    /// envelope authenticated.
    fn open(&self, passphrase: &SecretString, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = Vec::new();
        self.decrypt(passphrase, &mut &ciphertext[..], &mut out)?;
        Ok(out)
    }
}

/// age scrypt recipient over a zstd stream.
#[derive(Debug, Clone)]
pub struct AgeCipher {
    work_factor: Option<u8>,
    max_work_factor: u8,
    compression_level: i32,
}

impl AgeCipher {
    pub fn new(cfg: &CryptoConfig) -> Self {
        Self {
            work_factor: cfg.scrypt_work_factor,
            max_work_factor: cfg.max_work_factor,
            compression_level: cfg.compression_level,
        }
    }

    /// Fixed scrypt cost; low values keep tests fast.
    pub fn with_work_factor(log_n: u8) -> Self {
        Self {
            work_factor: Some(log_n),
            ..Self::new(&CryptoConfig::default())
        }
    }
}

impl Default for AgeCipher {
    fn default() -> Self {
        Self::new(&CryptoConfig::default())
    }
}

impl ChunkCipher for AgeCipher {
    fn encrypt(
        &self,
        passphrase: &SecretString,
        plaintext: &mut dyn Read,
        ciphertext: &mut dyn Write,
    ) -> Result<u64, CryptoError> {
        let mut recipient = age::scrypt::Recipient::new(copy_secret(passphrase));
        if let Some(log_n) = self.work_factor {
            recipient.set_work_factor(log_n);
        }

        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
                .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let sealed = encryptor.wrap_output(ciphertext)?;
        let mut compressor = zstd::stream::write::Encoder::new(sealed, self.compression_level)?;
        let consumed = std::io::copy(plaintext, &mut compressor)?;
        compressor.finish()?.finish()?;

        Ok(consumed)
    }

    fn decrypt(
        &self,
        passphrase: &SecretString,
        ciphertext: &mut dyn Read,
        plaintext: &mut dyn Write,
    ) -> Result<u64, CryptoError> {
        let decryptor = age::Decryptor::new(ciphertext).map_err(map_decrypt_error)?;
        if !decryptor.is_scrypt() {
            return Err(CryptoError::Malformed(
                "chunk is not passphrase-encrypted".into(),
            ));
        }

        let mut identity = age::scrypt::Identity::new(copy_secret(passphrase));
        identity.set_max_work_factor(self.max_work_factor);

        let reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn age::Identity))
            .map_err(map_decrypt_error)?;
        let mut decoder = zstd::stream::read::Decoder::new(reader)
            .map_err(|e| CryptoError::Malformed(format!("zstd: {e}")))?;

        // Read failures here are payload MAC or zstd errors; write failures
        // belong to the caller's sink.
        let mut buf = vec![0u8; 64 * 1024];
        let mut produced = 0u64;
        loop {
            let n = match decoder.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CryptoError::Malformed(e.to_string())),
            };
            plaintext.write_all(&buf[..n])?;
            produced += n as u64;
        }

        tracing::trace!(bytes = produced, "chunk decrypted");
        Ok(produced)
    }
}

fn copy_secret(passphrase: &SecretString) -> SecretString {
    SecretString::from(passphrase.expose_secret().to_owned())
}

fn map_decrypt_error(err: age::DecryptError) -> CryptoError {
    match err {
        age::DecryptError::DecryptionFailed
        | age::DecryptError::KeyDecryptionFailed
        | age::DecryptError::NoMatchingKeys => CryptoError::WrongPassphrase,
        age::DecryptError::ExcessiveWork { required, target } => CryptoError::Malformed(format!(
            "scrypt work factor {required} exceeds limit {target}"
        )),
        other => CryptoError::Malformed(other.to_string()),
    }
}
