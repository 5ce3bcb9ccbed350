//! Load Tests
//!
//! Open-loop append load: a fixed set of writers, one stream each, append a
//! fixed-size random payload as fast as they can for a fixed duration.
//!
//! The long-running variant is marked #[ignore] for opt-in execution.
//! Run with: cargo test --test store load -- --ignored --nocapture

use crate::common::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const STREAMS: usize = 16;
const PAYLOAD_SIZE: usize = 8096;

struct WriterReport {
    name: String,
    appends: u64,
    bytes_sent: u64,
}

fn run_load(store: &Arc<Store>, duration: Duration) -> Vec<WriterReport> {
    let handles: Vec<_> = (0..STREAMS)
        .map(|i| {
            let store = Arc::clone(store);
            thread::spawn(move || {
                let name = format!("load-{}", i);
                let mut appends = 0u64;
                let mut bytes_sent = 0u64;
                let deadline = Instant::now() + duration;
                while Instant::now() < deadline {
                    let buffer = batch(1, PAYLOAD_SIZE);
                    bytes_sent += buffer.len() as u64;
                    store.append(&name, buffer).unwrap();
                    appends += 1;
                }
                WriterReport {
                    name,
                    appends,
                    bytes_sent,
                }
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn check_and_report(test_store: &TestStore, reports: &[WriterReport], duration: Duration) {
    let store = test_store.store();
    let mut total_bytes = 0u64;
    for report in reports {
        assert!(report.appends > 0, "{} made no progress", report.name);
        assert_eq!(store.tail(&report.name).unwrap(), Offset::new(report.appends));
        assert_eq!(
            file_size(&test_store.stream_path(&report.name)),
            report.bytes_sent
        );
        total_bytes += report.bytes_sent;
    }

    let mb_per_sec = total_bytes as f64 / duration.as_secs_f64() / (1024.0 * 1024.0);
    println!(
        "{} streams x {}-byte payloads for {:?}: {} bytes, {:.1} MiB/s",
        STREAMS, PAYLOAD_SIZE, duration, total_bytes, mb_per_sec
    );
}

#[test]
fn short_load_run_keeps_streams_consistent() {
    let test_store = TestStore::new();
    let duration = Duration::from_millis(300);

    let reports = run_load(test_store.store(), duration);

    check_and_report(&test_store, &reports, duration);
}

#[test]
#[ignore]
fn stress_load_ten_seconds() {
    let test_store = TestStore::new();
    let duration = Duration::from_secs(10);

    let reports = run_load(test_store.store(), duration);

    check_and_report(&test_store, &reports, duration);
}
