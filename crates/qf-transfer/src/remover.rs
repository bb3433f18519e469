//! Bulk removal of every object under a prefix

use qf_core::QfResult;
use qf_storage::ObjectStore;
use tracing::{info, warn};

/// Delete every object whose name starts with `prefix`, one at a time.
///
/// Stops at the first failed deletion and returns that error; objects
/// removed before it stay removed. No matches is `Ok(0)`.
pub async fn remove_all<S: ObjectStore>(store: &S, prefix: &str) -> QfResult<usize> {
    let names = store.list_objects_with_prefix(prefix).await?;
    let mut removed = 0usize;

    for name in &names {
        if let Err(e) = store.remove(name).await {
            warn!(name = %name, removed, error = %e, "bulk removal aborted");
            return Err(e.into());
        }
        removed += 1;
    }

    info!(prefix = %prefix, removed, "bulk removal complete");
    Ok(removed)
}
