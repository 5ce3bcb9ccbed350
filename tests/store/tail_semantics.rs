//! Tail Semantics Tests
//!
//! The tail is the next offset to assign: 0 for an empty stream, and after
//! appends of n_1..n_k messages, the sum of the n_j. The file holds exactly
//! offsets 0..tail in order.

use crate::common::*;

#[test]
fn empty_stream_tail_is_zero() {
    let test_store = TestStore::new();
    assert_eq!(test_store.store().tail("fresh").unwrap(), Offset::EMPTY);
}

#[test]
fn tail_is_sum_of_batch_sizes() {
    let test_store = TestStore::new();
    let store = test_store.store();
    let sizes = [1usize, 4, 2, 9, 1, 3];

    let mut expected = 0u64;
    for &n in &sizes {
        expected += n as u64;
        let tail = store.append("sum", batch(n, 32)).unwrap();
        assert_eq!(tail, Offset::new(expected));
    }

    store.sync_all().unwrap();
    let offsets = read_offsets(&test_store.stream_path("sum"));
    assert_eq!(offsets, (0..expected).collect::<Vec<_>>());
}

#[test]
fn payloads_are_stored_verbatim() {
    let test_store = TestStore::new_strict();
    let store = test_store.store();
    let payloads: Vec<Vec<u8>> = (0..5).map(|i| random_payload(i * 50)).collect();

    store
        .append("verbatim", encode_message_set(&payloads))
        .unwrap();

    let frames = read_frames(&test_store.stream_path("verbatim"));
    assert_eq!(frames.len(), 5);
    for (i, (offset, payload)) in frames.into_iter().enumerate() {
        assert_eq!(offset, i as u64);
        assert_eq!(payload, payloads[i]);
    }
}

#[test]
fn caller_offsets_are_overwritten() {
    let test_store = TestStore::new_strict();
    let store = test_store.store();

    // Two frames whose offset fields claim 99 and 12345.
    let mut raw = Vec::new();
    for claimed in [99u64, 12345] {
        raw.extend_from_slice(&10u32.to_le_bytes());
        raw.extend_from_slice(&claimed.to_le_bytes());
        raw.extend_from_slice(b"hi");
    }

    assert_eq!(store.append("claims", raw).unwrap(), Offset::new(2));
    assert_eq!(read_offsets(&test_store.stream_path("claims")), vec![0, 1]);
}

#[test]
fn empty_batch_returns_current_tail() {
    let test_store = TestStore::new();
    let store = test_store.store();
    store.append("idle", batch(3, 8)).unwrap();

    assert_eq!(store.append("idle", Vec::new()).unwrap(), Offset::new(3));
    assert_eq!(store.stream("idle").unwrap().position(), 3 * frame_size(8));
}

#[test]
fn zero_length_payloads_are_messages() {
    let test_store = TestStore::new();
    let store = test_store.store();

    let tail = store.append("empty-payloads", batch(4, 0)).unwrap();

    assert_eq!(tail, Offset::new(4));
    assert_eq!(
        store.stream("empty-payloads").unwrap().position(),
        4 * frame_size(0)
    );
}

#[test]
fn malformed_batches_are_rejected() {
    let test_store = TestStore::new();
    let store = test_store.store();
    store.append("strict", batch(1, 4)).unwrap();

    let mut overrun = batch(2, 4);
    overrun.truncate(overrun.len() - 1);
    let mut short = 4u32.to_le_bytes().to_vec();
    short.extend_from_slice(&[0u8; 8]);

    for bad in [vec![0u8, 1], overrun, short] {
        let err = store.append("strict", bad).unwrap_err();
        assert!(matches!(err, StrandError::Framing(_)), "{:?}", err);
        assert!(!err.is_retryable());
    }
    assert_eq!(store.tail("strict").unwrap(), Offset::new(1));
}

#[test]
fn store_runs_under_injected_span() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let span = tracing::info_span!("tenant", id = 7);

    let store = Store::with_span(StoreConfig::new(dir.path()), span).unwrap();

    store.ping().unwrap();
    assert_eq!(store.append("spanned", batch(2, 3)).unwrap(), Offset::new(2));
}
