//! Transfer identifiers: short random object key + cipher key
//!
//! The alphabet drops 0/1/i/l/o so identifiers survive being read aloud or
//! retyped from a screenshot.

use qf_core::{QfError, QfResult};
use qf_crypto::{ExposeSecret, SecretString};
use rand::Rng;

/// Characters allowed in both halves of an identifier.
pub const ALPHABET: &[u8] = b"23456789abcdefghjkmnpqrstuvwxyz";

/// Draw `len` characters uniformly from [`ALPHABET`].
pub fn random_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// `objectKey ++ cipherKey`. Only the object key ever reaches the store.
pub struct TransferIdentifier {
    object_key: String,
    cipher_key: SecretString,
}

impl TransferIdentifier {
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        object_key_length: usize,
        cipher_key_length: usize,
    ) -> Self {
        let object_key = random_code(rng, object_key_length);
        let cipher_key = SecretString::from(random_code(rng, cipher_key_length));
        Self {
            object_key,
            cipher_key,
        }
    }

    /// Split a user-supplied identifier at the fixed object-key length.
    ///
    /// Input is trimmed and lower-cased; anything outside the alphabet is
    /// rejected before the store is touched.
    pub fn parse(input: &str, object_key_length: usize) -> QfResult<Self> {
        let normalized = input.trim().to_ascii_lowercase();

        if let Some(bad) = normalized.bytes().find(|b| !ALPHABET.contains(b)) {
            return Err(QfError::InvalidIdentifier(format!(
                "unexpected character {:?}",
                bad as char
            )));
        }
        if normalized.len() <= object_key_length {
            return Err(QfError::InvalidIdentifier(format!(
                "expected more than {object_key_length} characters, got {}",
                normalized.len()
            )));
        }

        // All bytes are ASCII at this point, so the split is a char boundary.
        let (object_key, cipher_key) = normalized.split_at(object_key_length);
        Ok(Self {
            object_key: object_key.to_string(),
            cipher_key: SecretString::from(cipher_key.to_string()),
        })
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn cipher_key(&self) -> &SecretString {
        &self.cipher_key
    }

    /// The shareable form, printed to the sender as `ID: ...`.
    pub fn reveal(&self) -> String {
        format!("{}{}", self.object_key, self.cipher_key.expose_secret())
    }
}

impl std::fmt::Debug for TransferIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferIdentifier")
            .field("object_key", &self.object_key)
            .field("cipher_key", &"[REDACTED]")
            .finish()
    }
}
