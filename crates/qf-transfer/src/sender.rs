//! Sender pipeline: input stream → size-bounded chunks → seal → upload
//!
//! Chunk 1 is bounded by `first_chunk_size` so the receiver can start
//! emitting quickly; every later chunk by `chunk_size`. The final chunk is
//! named with `_1` and may be short (or empty, for empty input).

use qf_core::config::TransferConfig;
use qf_core::{QfError, QfResult};
use qf_crypto::ChunkCipher;
use qf_storage::ObjectStore;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::ident::TransferIdentifier;
use crate::naming::ChunkName;
use crate::ProgressFn;

/// Result of a completed send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub chunks: u64,
    /// Plaintext bytes consumed from the input
    pub bytes: u64,
}

pub struct Sender<'a, S, C> {
    store: &'a S,
    cipher: &'a C,
    config: &'a TransferConfig,
}

impl<'a, S: ObjectStore, C: ChunkCipher> Sender<'a, S, C> {
    pub fn new(store: &'a S, cipher: &'a C, config: &'a TransferConfig) -> Self {
        Self {
            store,
            cipher,
            config,
        }
    }

    /// Fresh identifier with the configured key lengths.
    ///
    /// Hand it to the user before calling [`Sender::send`], so they hold it
    /// even if a later upload fails.
    pub fn identifier<R: Rng + ?Sized>(&self, rng: &mut R) -> TransferIdentifier {
        TransferIdentifier::generate(
            rng,
            self.config.object_key_length,
            self.config.cipher_key_length,
        )
    }

    /// Consume `input` to end-of-stream, uploading one object per chunk.
    ///
    /// The first upload error aborts; chunks already uploaded stay put.
    pub async fn send<R>(
        &self,
        id: &TransferIdentifier,
        input: R,
        progress: Option<&ProgressFn>,
    ) -> QfResult<SendOutcome>
    where
        R: AsyncRead + Unpin,
    {
        if self.config.first_chunk_size == 0 || self.config.chunk_size == 0 {
            return Err(QfError::Config("chunk sizes must be non-zero".into()));
        }

        let mut reader = BufReader::with_capacity(64 * 1024, input);
        let mut index: u64 = 1;
        let mut total: u64 = 0;

        loop {
            let limit = if index == 1 {
                self.config.first_chunk_size
            } else {
                self.config.chunk_size
            };

            let mut payload = Vec::with_capacity(limit);
            (&mut reader)
                .take(limit as u64)
                .read_to_end(&mut payload)
                .await?;

            // A full chunk is only the last one if nothing follows it.
            let is_last = payload.len() < limit || reader.fill_buf().await?.is_empty();

            let name = ChunkName::new(id.object_key(), index, is_last).object_name(&self.config.prefix);
            let ciphertext = self.cipher.seal(id.cipher_key(), &payload)?;
            let sealed_len = ciphertext.len();

            if let Err(e) = self.store.upload(&name, ciphertext).await {
                warn!(name = %name, index, error = %e, "chunk upload failed, aborting send");
                return Err(e.into());
            }

            total += payload.len() as u64;
            debug!(
                name = %name,
                index,
                bytes = payload.len(),
                sealed = sealed_len,
                is_last,
                "chunk uploaded"
            );

            if let Some(cb) = progress {
                cb(index, total, &name);
            }

            if is_last {
                break;
            }
            index += 1;
        }

        info!(object_key = %id.object_key(), chunks = index, bytes = total, "send complete");

        Ok(SendOutcome {
            chunks: index,
            bytes: total,
        })
    }
}
