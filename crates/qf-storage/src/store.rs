//! Object store capability and its OpenDAL implementation

use std::future::Future;

use opendal::{ErrorKind, Operator};
use qf_core::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// The only storage verbs the transfer protocol relies on.
///
/// Names are flat (no `/`), so "list" means the whole bucket root.
pub trait ObjectStore: Send + Sync {
    fn list_objects(&self) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    fn list_objects_with_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    /// Fetch an object; `StoreError::NotFound` when it doesn't exist.
    fn download(&self, name: &str) -> impl Future<Output = StoreResult<Vec<u8>>> + Send;

    fn upload(&self, name: &str, data: Vec<u8>) -> impl Future<Output = StoreResult<()>> + Send;

    fn remove(&self, name: &str) -> impl Future<Output = StoreResult<()>> + Send;
}

/// `ObjectStore` over any OpenDAL service.
#[derive(Clone, Debug)]
pub struct OpendalStore {
    op: Operator,
}

impl OpendalStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    /// Unlayered in-memory store, for tests and dry runs.
    pub fn memory() -> anyhow::Result<Self> {
        let op = Operator::new(opendal::services::Memory::default())?.finish();
        Ok(Self { op })
    }
}

impl ObjectStore for OpendalStore {
    async fn list_objects(&self) -> StoreResult<Vec<String>> {
        let entries = self.op.list("/").await.map_err(|e| classify("/", e))?;
        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|e| e.metadata().is_file())
            .map(|e| e.path().trim_start_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_objects_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut names = self.list_objects().await?;
        names.retain(|n| n.starts_with(prefix));
        Ok(names)
    }

    async fn download(&self, name: &str) -> StoreResult<Vec<u8>> {
        let buf = self.op.read(name).await.map_err(|e| classify(name, e))?;
        Ok(buf.to_vec())
    }

    async fn upload(&self, name: &str, data: Vec<u8>) -> StoreResult<()> {
        self.op
            .write(name, data)
            .await
            .map(|_| ())
            .map_err(|e| classify(name, e))
    }

    async fn remove(&self, name: &str) -> StoreResult<()> {
        self.op.delete(name).await.map_err(|e| classify(name, e))
    }
}

/// Map an OpenDAL error onto the retry taxonomy.
fn classify(name: &str, err: opendal::Error) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
        ErrorKind::PermissionDenied | ErrorKind::ConfigInvalid | ErrorKind::Unsupported => {
            StoreError::Fatal(format!("{name}: {err}"))
        }
        _ => StoreError::Transient(format!("{name}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_download_remove() {
        let store = OpendalStore::memory().unwrap();

        store.upload("qf_ab_1_1", b"cipher".to_vec()).await.unwrap();
        assert_eq!(store.download("qf_ab_1_1").await.unwrap(), b"cipher");

        store.remove("qf_ab_1_1").await.unwrap();
        let err = store.download("qf_ab_1_1").await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("qf_ab_1_1".into()));
    }

    #[tokio::test]
    async fn download_missing_is_not_found() {
        let store = OpendalStore::memory().unwrap();
        let err = store.download("qf_zz_1_0").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = OpendalStore::memory().unwrap();
        for name in ["qf_ab_1_0", "qf_ab_2_1", "qf_cd_1_1", "backup.tar"] {
            store.upload(name, vec![0u8; 4]).await.unwrap();
        }

        let all = store.list_objects().await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.contains(&"backup.tar".to_string()));

        let ab = store.list_objects_with_prefix("qf_ab_").await.unwrap();
        assert_eq!(ab, vec!["qf_ab_1_0".to_string(), "qf_ab_2_1".to_string()]);

        let none = store.list_objects_with_prefix("other_").await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn classify_maps_kinds() {
        let nf = opendal::Error::new(ErrorKind::NotFound, "gone");
        assert_eq!(classify("x", nf), StoreError::NotFound("x".into()));

        let denied = opendal::Error::new(ErrorKind::PermissionDenied, "403");
        assert!(matches!(classify("x", denied), StoreError::Fatal(_)));

        let flaky = opendal::Error::new(ErrorKind::Unexpected, "connection reset");
        assert!(matches!(classify("x", flaky), StoreError::Transient(_)));
    }
}
