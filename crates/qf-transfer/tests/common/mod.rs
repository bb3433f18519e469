//! Shared fixtures: an in-memory store with an op log and fault injection.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use qf_core::config::TransferConfig;
use qf_core::StoreError;
use qf_crypto::AgeCipher;
use qf_storage::{ObjectStore, OpendalStore};
use qf_transfer::TransferIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Get(String),
    Put(String),
    Del(String),
}

/// Wraps the memory store, records every call and fails on request.
pub struct ScriptedStore {
    inner: OpendalStore,
    ops: Mutex<Vec<Op>>,
    download_faults: Mutex<HashMap<String, VecDeque<StoreError>>>,
    list_fault: Mutex<Option<StoreError>>,
    upload_budget: Mutex<Option<usize>>,
    remove_budget: Mutex<Option<usize>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            inner: OpendalStore::memory().expect("memory store"),
            ops: Mutex::new(Vec::new()),
            download_faults: Mutex::new(HashMap::new()),
            list_fault: Mutex::new(None),
            upload_budget: Mutex::new(None),
            remove_budget: Mutex::new(None),
        }
    }

    /// Queue errors returned by the next downloads of `name`, in order.
    pub fn fail_download(&self, name: &str, errors: impl IntoIterator<Item = StoreError>) {
        self.download_faults
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .extend(errors);
    }

    /// Fail every listing with `err`.
    pub fn fail_list(&self, err: StoreError) {
        *self.list_fault.lock().unwrap() = Some(err);
    }

    /// Let `n` uploads succeed, then fail every later one.
    pub fn fail_uploads_after(&self, n: usize) {
        *self.upload_budget.lock().unwrap() = Some(n);
    }

    /// Let `n` removals succeed, then fail every later one.
    pub fn fail_removes_after(&self, n: usize) {
        *self.remove_budget.lock().unwrap() = Some(n);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Get(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub async fn names(&self) -> Vec<String> {
        self.inner.list_objects().await.expect("list")
    }

    /// Store an object directly, bypassing the op log and faults.
    pub async fn seed(&self, name: &str, data: &[u8]) {
        self.inner.upload(name, data.to_vec()).await.expect("seed");
    }

    pub async fn raw(&self, name: &str) -> Vec<u8> {
        self.inner.download(name).await.expect("raw download")
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }

    fn take_budget(slot: &Mutex<Option<usize>>) -> bool {
        let mut guard = slot.lock().unwrap();
        match guard.as_mut() {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

impl ObjectStore for ScriptedStore {
    async fn list_objects(&self) -> Result<Vec<String>, StoreError> {
        let fault = self.list_fault.lock().unwrap().clone();
        match fault {
            Some(err) => Err(err),
            None => self.inner.list_objects().await,
        }
    }

    async fn list_objects_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let fault = self.list_fault.lock().unwrap().clone();
        match fault {
            Some(err) => Err(err),
            None => self.inner.list_objects_with_prefix(prefix).await,
        }
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.record(Op::Get(name.to_string()));
        let fault = self
            .download_faults
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(|q| q.pop_front());
        match fault {
            Some(err) => Err(err),
            None => self.inner.download(name).await,
        }
    }

    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.record(Op::Put(name.to_string()));
        if !Self::take_budget(&self.upload_budget) {
            return Err(StoreError::Transient(format!("{name}: injected upload failure")));
        }
        self.inner.upload(name, data).await
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.record(Op::Del(name.to_string()));
        if !Self::take_budget(&self.remove_budget) {
            return Err(StoreError::Transient(format!("{name}: injected remove failure")));
        }
        self.inner.remove(name).await
    }
}

/// Cheap scrypt cost so tests stay fast.
pub fn test_cipher() -> AgeCipher {
    AgeCipher::with_work_factor(10)
}

/// Small chunks so a few hundred bytes span several objects.
pub fn small_chunks(first: usize, rest: usize) -> TransferConfig {
    TransferConfig {
        first_chunk_size: first,
        chunk_size: rest,
        ..TransferConfig::default()
    }
}

pub fn fixed_id() -> TransferIdentifier {
    TransferIdentifier::parse("ab23456789xy", 2).expect("valid identifier")
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
