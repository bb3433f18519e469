//! Bucket reachability check

use qf_core::StoreError;

use crate::store::{ObjectStore, StoreResult};

/// Verify the bucket can be listed before a receive starts probing.
///
/// A missing bucket reads as `NotFound` on every object lookup, which the
/// receiver would retry until its budget runs out. Listing surfaces it as
/// `StoreError::Fatal` instead. Returns the matching names.
pub async fn check_bucket<S: ObjectStore>(store: &S, prefix: &str) -> StoreResult<Vec<String>> {
    store
        .list_objects_with_prefix(prefix)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(name) => {
                StoreError::Fatal(format!("bucket not found or not listable ({name})"))
            }
            other => other,
        })
}
