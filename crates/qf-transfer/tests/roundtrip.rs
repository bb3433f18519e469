//! Integration test: send → receive round-trip over an in-memory store
//!
//! Runs with the default end-detection and backoff policies on a paused
//! clock, so the probe for each final chunk costs no wall time.

mod common;

use common::{fixed_id, pattern, small_chunks, test_cipher, Op, ScriptedStore};
use qf_transfer::{Receiver, Sender};

async fn send_bytes(store: &ScriptedStore, data: &[u8], first: usize, rest: usize) -> u64 {
    let cipher = test_cipher();
    let cfg = small_chunks(first, rest);
    let outcome = Sender::new(store, &cipher, &cfg)
        .send(&fixed_id(), data, None)
        .await
        .expect("send should succeed");
    assert_eq!(outcome.bytes, data.len() as u64);
    outcome.chunks
}

async fn receive_bytes(store: &ScriptedStore, keep: bool) -> Vec<u8> {
    let cipher = test_cipher();
    let cfg = small_chunks(4, 8);
    let mut out = Vec::new();
    Receiver::new(store, &cipher, &cfg)
        .keep(keep)
        .receive(&fixed_id(), &mut out, None)
        .await
        .expect("receive should succeed");
    out
}

#[tokio::test(start_paused = true)]
async fn roundtrip_single_chunk() {
    let store = ScriptedStore::new();
    let original = b"hello";

    let chunks = send_bytes(&store, original, 1024, 1024).await;
    assert_eq!(chunks, 1);
    assert_eq!(store.names().await, vec!["qf_ab_1_1".to_string()]);

    let out = receive_bytes(&store, false).await;
    assert_eq!(out, original);
}

#[tokio::test(start_paused = true)]
async fn roundtrip_multi_chunk() {
    let store = ScriptedStore::new();
    let original = pattern(20);

    let chunks = send_bytes(&store, &original, 4, 8).await;
    assert_eq!(chunks, 3);
    assert_eq!(
        store.names().await,
        vec!["qf_ab_1_0", "qf_ab_2_0", "qf_ab_3_1"]
    );

    let out = receive_bytes(&store, false).await;
    assert_eq!(out, original, "received bytes must match the input");
}

#[tokio::test(start_paused = true)]
async fn input_on_chunk_boundary_has_no_empty_tail() {
    let store = ScriptedStore::new();
    let original = pattern(12);

    let chunks = send_bytes(&store, &original, 4, 8).await;
    assert_eq!(chunks, 2);
    assert_eq!(store.names().await, vec!["qf_ab_1_0", "qf_ab_2_1"]);

    assert_eq!(receive_bytes(&store, false).await, original);
}

#[tokio::test(start_paused = true)]
async fn empty_input_sends_one_empty_final_chunk() {
    let store = ScriptedStore::new();

    let chunks = send_bytes(&store, b"", 4, 8).await;
    assert_eq!(chunks, 1);
    assert_eq!(store.names().await, vec!["qf_ab_1_1"]);

    // the envelope is never empty even when the payload is
    assert!(!store.raw("qf_ab_1_1").await.is_empty());

    assert!(receive_bytes(&store, false).await.is_empty());
    assert!(store.names().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn keep_leaves_every_chunk_in_place() {
    let store = ScriptedStore::new();
    let original = pattern(20);
    send_bytes(&store, &original, 4, 8).await;

    assert_eq!(receive_bytes(&store, true).await, original);
    assert_eq!(store.names().await.len(), 3);
    assert!(!store.ops().iter().any(|op| matches!(op, Op::Del(_))));

    // a kept transfer can be received again
    assert_eq!(receive_bytes(&store, true).await, original);
}

#[tokio::test(start_paused = true)]
async fn each_chunk_is_deleted_right_after_it_is_read() {
    let store = ScriptedStore::new();
    send_bytes(&store, &pattern(20), 4, 8).await;
    store.clear_ops();

    receive_bytes(&store, false).await;

    let get = |n: &str| Op::Get(n.to_string());
    let del = |n: &str| Op::Del(n.to_string());
    assert_eq!(
        store.ops(),
        vec![
            get("qf_ab_1_0"),
            del("qf_ab_1_0"),
            get("qf_ab_2_0"),
            del("qf_ab_2_0"),
            get("qf_ab_3_0"),
            get("qf_ab_3_1"),
            del("qf_ab_3_1"),
        ]
    );
    assert!(store.names().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn progress_reports_running_totals() {
    use std::sync::{Arc, Mutex};

    let store = ScriptedStore::new();
    let cipher = test_cipher();
    let cfg = small_chunks(4, 8);
    let seen: Arc<Mutex<Vec<(u64, u64)>>> = Arc::default();

    let sink = seen.clone();
    let progress: qf_transfer::ProgressFn = Box::new(move |chunks, bytes, _name| {
        sink.lock().unwrap().push((chunks, bytes));
    });

    Sender::new(&store, &cipher, &cfg)
        .send(&fixed_id(), &pattern(20)[..], Some(&progress))
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(1, 4), (2, 12), (3, 20)]);
}
