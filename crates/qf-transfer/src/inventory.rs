//! Summaries of transfers still sitting in the bucket
//!
//! Built purely from object names. Cipher keys never reach the store, so a
//! summary reveals which object keys exist but not how to read them.

use std::collections::{BTreeMap, BTreeSet};

use qf_core::QfResult;
use qf_storage::ObjectStore;

use crate::naming::ChunkName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub object_key: String,
    /// Chunk objects present, counting both name variants
    pub objects: usize,
    /// Distinct indices present
    pub chunks: usize,
    pub highest_index: u64,
    /// Highest index stored under a final (`_1`) name
    pub last_index: Option<u64>,
    /// Number of final (`_1`) names
    pub final_markers: usize,
}

impl TransferSummary {
    /// Exactly one final chunk, every index `1..=last` present, and no index
    /// stored under both names.
    pub fn is_complete(&self) -> bool {
        match self.last_index {
            Some(last) => {
                self.final_markers == 1
                    && self.highest_index == last
                    && self.chunks as u64 == last
                    && self.objects == self.chunks
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct Tally {
    objects: usize,
    indices: BTreeSet<u64>,
    finals: BTreeSet<u64>,
}

/// Group the bucket's qf objects by object key. Unrelated names are skipped.
pub async fn pending_transfers<S: ObjectStore>(
    store: &S,
    prefix: &str,
) -> QfResult<Vec<TransferSummary>> {
    let mut by_key: BTreeMap<String, Tally> = BTreeMap::new();

    for name in store.list_objects().await? {
        let Some(chunk) = ChunkName::parse(&name, prefix) else {
            continue;
        };
        let tally = by_key.entry(chunk.object_key).or_default();
        tally.objects += 1;
        tally.indices.insert(chunk.index);
        if chunk.is_last {
            tally.finals.insert(chunk.index);
        }
    }

    Ok(by_key
        .into_iter()
        .map(|(object_key, t)| TransferSummary {
            object_key,
            objects: t.objects,
            chunks: t.indices.len(),
            highest_index: t.indices.last().copied().unwrap_or(0),
            last_index: t.finals.last().copied(),
            final_markers: t.finals.len(),
        })
        .collect())
}
