//! qf-crypto: independent passphrase encryption of each transfer chunk
//!
//! Chunk envelope:
//! ```text
//! age v1 (scrypt recipient, passphrase = cipher key)
//!   └── zstd frame
//!         └── chunk plaintext
//! ```
//!
//! Chunks share nothing but the raw passphrase: every envelope carries its
//! own scrypt salt and file key, so any chunk decrypts on its own.

pub mod cipher;

pub use cipher::{AgeCipher, ChunkCipher};
pub use secrecy::{ExposeSecret, SecretString};
