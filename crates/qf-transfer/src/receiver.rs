//! Receiver state machine
//!
//! State is `(index, probe_is_last, fails)`, starting at `(1, false, 0)`.
//!
//! ```text
//! lookup <prefix>_<key>_<index>_<probe_is_last>
//!   hit  → fails = 0, open, write to sink, delete unless keep
//!          probe_is_last ? done : index += 1
//!   miss → fails += 1
//!          exhausted(fails) ? ProtocolError : sleep backoff(fails)
//!          probe_is_last = probe_is_last(fails)
//! ```
//!
//! Before the first lookup the transfer's prefix is listed once; a missing
//! bucket fails there as a fatal store error. Afterwards only not-found and
//! transient store errors count as misses. Fatal store errors and crypto
//! errors abort immediately. Plaintext reaches the sink
//! only after a chunk fully authenticated.

use qf_core::config::TransferConfig;
use qf_core::{QfError, QfResult};
use qf_crypto::ChunkCipher;
use qf_storage::{check_bucket, ObjectStore};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::ident::TransferIdentifier;
use crate::naming::{transfer_prefix, ChunkName};
use crate::strategy::{Backoff, EndDetection, FailureHeuristic, LinearBackoff};
use crate::ProgressFn;

/// Result of a completed receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOutcome {
    pub chunks: u64,
    /// Plaintext bytes written to the sink
    pub bytes: u64,
}

pub struct Receiver<'a, S, C> {
    store: &'a S,
    cipher: &'a C,
    prefix: String,
    keep: bool,
    end_detection: Box<dyn EndDetection>,
    backoff: Box<dyn Backoff>,
}

impl<'a, S: ObjectStore, C: ChunkCipher> Receiver<'a, S, C> {
    pub fn new(store: &'a S, cipher: &'a C, config: &TransferConfig) -> Self {
        Self {
            store,
            cipher,
            prefix: config.prefix.clone(),
            keep: config.keep,
            end_detection: Box::new(FailureHeuristic::new(config.failure_budget)),
            backoff: Box::new(LinearBackoff::new(Duration::from_secs(
                config.backoff_interval_secs,
            ))),
        }
    }

    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_end_detection(mut self, strategy: impl EndDetection + 'static) -> Self {
        self.end_detection = Box::new(strategy);
        self
    }

    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// Probe, decrypt and emit chunks in order until the final chunk.
    pub async fn receive<W>(
        &self,
        id: &TransferIdentifier,
        sink: &mut W,
        progress: Option<&ProgressFn>,
    ) -> QfResult<ReceiveOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        let family = transfer_prefix(&self.prefix, id.object_key());
        let visible = check_bucket(self.store, &family).await?;
        debug!(object_key = %id.object_key(), visible = visible.len(), "bucket reachable");

        let mut index: u64 = 1;
        let mut fails: u32 = 0;
        let mut total: u64 = 0;

        loop {
            let probe_is_last = self.end_detection.probe_is_last(fails);
            let name =
                ChunkName::new(id.object_key(), index, probe_is_last).object_name(&self.prefix);

            let ciphertext = match self.store.download(&name).await {
                Ok(data) => data,
                Err(e) if e.is_retryable() => {
                    fails += 1;
                    debug!(name = %name, fails, error = %e, "chunk lookup missed");

                    if self.end_detection.exhausted(fails) {
                        warn!(name = %name, index, attempts = fails, "giving up on chunk");
                        return Err(QfError::Protocol {
                            index,
                            attempts: fails,
                        });
                    }

                    let delay = self.backoff.delay(fails);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            fails = 0;
            let plaintext = self.cipher.open(id.cipher_key(), &ciphertext)?;
            sink.write_all(&plaintext).await?;
            sink.flush().await?;
            total += plaintext.len() as u64;

            debug!(name = %name, index, bytes = plaintext.len(), "chunk received");

            if !self.keep {
                // Deletion failures are logged, never fatal.
                if let Err(e) = self.store.remove(&name).await {
                    warn!(name = %name, error = %e, "failed to delete received chunk");
                }
            }

            if let Some(cb) = progress {
                cb(index, total, &name);
            }

            if probe_is_last {
                info!(object_key = %id.object_key(), chunks = index, bytes = total, "receive complete");
                return Ok(ReceiveOutcome {
                    chunks: index,
                    bytes: total,
                });
            }
            index += 1;
        }
    }
}
