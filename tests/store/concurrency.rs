//! Concurrency Tests
//!
//! Appends to one stream serialize; appends to different streams proceed
//! independently. Every offset is assigned exactly once.

use crate::common::*;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn concurrent_single_message_appends_assign_each_offset_once() {
    let test_store = TestStore::new();
    let store = Arc::clone(test_store.store());
    let threads = 8;
    let per_thread = 200;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_thread)
                    .map(|_| store.append("shared", batch(1, 24)).unwrap().as_u64())
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut tails = HashSet::new();
    for handle in handles {
        for tail in handle.join().unwrap() {
            assert!(tails.insert(tail), "tail {} returned twice", tail);
        }
    }

    let total = (threads * per_thread) as u64;
    assert_eq!(tails, (1..=total).collect::<HashSet<u64>>());
    assert_eq!(store.tail("shared").unwrap(), Offset::new(total));

    store.sync_all().unwrap();
    assert_eq!(
        read_offsets(&test_store.stream_path("shared")),
        (0..total).collect::<Vec<_>>()
    );
}

#[test]
fn concurrent_batches_stay_contiguous() {
    let test_store = TestStore::new();
    let store = Arc::clone(test_store.store());
    let threads = 6;
    let per_thread = 40;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut ranges = Vec::new();
                for i in 0..per_thread {
                    let n = 1 + (t + i) % 5;
                    let receipt = store.append_batch("batches", batch(n, 16)).unwrap();
                    assert_eq!(receipt.count, n);
                    assert_eq!(
                        receipt.next_offset.as_u64() - receipt.first_offset.as_u64(),
                        n as u64
                    );
                    ranges.push((receipt.first_offset.as_u64(), receipt.next_offset.as_u64()));
                }
                ranges
            })
        })
        .collect();

    let mut ranges: Vec<(u64, u64)> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ranges.sort();

    let mut expected_start = 0;
    for (start, end) in &ranges {
        assert_eq!(*start, expected_start, "gap or overlap at {}", start);
        expected_start = *end;
    }
    assert_eq!(store.tail("batches").unwrap(), Offset::new(expected_start));
}

#[test]
fn first_use_from_many_threads_creates_one_stream() {
    let test_store = TestStore::new();
    let store = Arc::clone(test_store.store());
    let threads = 12;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.stream("lazy").unwrap()
            })
        })
        .collect();

    let streams: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for stream in &streams[1..] {
        assert!(Arc::ptr_eq(&streams[0], stream));
    }
    assert_eq!(store.streams().len(), 1);
}

#[test]
fn streams_do_not_share_offsets() {
    let test_store = TestStore::new();
    let store = Arc::clone(test_store.store());
    let names: Vec<String> = (0..8).map(|i| format!("stream-{}", i)).collect();

    let handles: Vec<_> = names
        .iter()
        .cloned()
        .map(|name| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    store.append(&name, batch(2, 8)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for name in &names {
        assert_eq!(store.tail(name).unwrap(), Offset::new(200));
    }
    assert_eq!(store.streams().len(), names.len());
}
