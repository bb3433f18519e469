//! qf-transfer: push a byte stream into an object store as independently
//! encrypted chunks, and pull it back knowing only a short identifier.
//!
//! There is no manifest. The chunk family, index and end marker all live in
//! the object name (`<prefix>_<objectKey>_<index>_<isLast>`), so the receiver
//! discovers where a transfer ends by probing names in order:
//!
//! ```text
//! sender:   stdin ─► chunk ─► seal ─► put qf_ab_1_0, qf_ab_2_0, ..., qf_ab_N_1
//! receiver: get qf_ab_1_0 ─► open ─► stdout ─► del ─► get qf_ab_2_0 ─► ...
//!           miss at index i ─► probe qf_ab_i_1 (end-detection strategy)
//! ```

pub mod ident;
pub mod inventory;
pub mod naming;
pub mod receiver;
pub mod remover;
pub mod sender;
pub mod strategy;

pub use ident::{random_code, TransferIdentifier, ALPHABET};
pub use inventory::{pending_transfers, TransferSummary};
pub use naming::{family_prefix, transfer_prefix, ChunkName};
pub use receiver::{ReceiveOutcome, Receiver};
pub use remover::remove_all;
pub use sender::{SendOutcome, Sender};
pub use strategy::{Backoff, EndDetection, FailureHeuristic, LinearBackoff};

/// Progress callback type (chunks_done, bytes_done, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;
