//! End-to-end properties of the observer: fragmentation invariance, reuse
//! correlation, pipelining order, overflow containment.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use http::Method;
use tap_http::codec::FeedOutcome;
use tap_http::listener::TapListener;
use tap_http::tap::{ConnectionFacts, ConnectionTap};
use tap_http::time::Clock;
use tap_http::transaction::{Lifecycle, TransactionData, UNSET};

#[derive(Debug, Default)]
struct ManualClock(AtomicI64);

impl ManualClock {
    fn at(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }

    fn set(&self, at: i64) {
        self.0.store(at, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Collector {
    completed: Arc<Mutex<Vec<TransactionData>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl TapListener for Collector {
    fn on_transaction_complete(&mut self, data: &TransactionData) {
        self.completed.lock().unwrap().push(data.clone());
    }

    fn on_transaction_error(&mut self, _data: &TransactionData, error: &str) {
        self.errors.lock().unwrap().push(error.to_owned());
    }
}

fn observed_tap(clock: Arc<ManualClock>) -> (ConnectionTap, Arc<Mutex<Vec<TransactionData>>>) {
    let facts = ConnectionFacts::new("example.com", "93.184.216.34", 443);
    let mut tap = ConnectionTap::with_clock(facts, clock);
    let collector = Collector::default();
    let completed = Arc::clone(&collector.completed);
    tap.add_listener(Box::new(collector));
    (tap, completed)
}

/// Three pipelined responses: fixed length, chunked with trailers, empty.
const WIRE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello\
HTTP/1.1 206 Partial Content\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nwiki\r\n5\r\npedia\r\n0\r\nVia: cache-3\r\n\r\n\
HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";

fn run_fragmented(fragment_size: usize) -> Vec<TransactionData> {
    let clock = Arc::new(ManualClock::at(50_000));
    let (mut tap, completed) = observed_tap(Arc::clone(&clock));

    let mut outbound = tap.outbound();
    for path in ["/a", "/b", "/c"] {
        outbound.start_request(&Method::GET, path);
        outbound.record_write(64);
        outbound.finish_request();
    }

    for fragment in WIRE.chunks(fragment_size) {
        assert_eq!(tap.deliver(fragment), FeedOutcome::Ok);
    }

    let exports = completed.lock().unwrap().clone();
    exports
}

#[test]
fn fragmentation_invariance() {
    let single_slice = run_fragmented(WIRE.len());
    assert_eq!(single_slice.len(), 3);
    assert_eq!(single_slice[0].status_code, 200);
    assert_eq!(single_slice[0].bytes_received, 5);
    assert_eq!(single_slice[1].status_code, 206);
    assert_eq!(single_slice[1].bytes_received, 9);
    assert_eq!(single_slice[2].status_code, 404);
    assert_eq!(single_slice[2].bytes_received, 0);

    // identical events and counters at every fragmentation granularity
    for fragment_size in [1, 2, 3, 7, 16, 61] {
        assert_eq!(run_fragmented(fragment_size), single_slice, "fragment size {fragment_size}");
    }
}

#[test]
fn minimal_message_scenario() {
    let clock = Arc::new(ManualClock::at(1_000));
    let (mut tap, completed) = observed_tap(Arc::clone(&clock));

    let mut outbound = tap.outbound();
    outbound.start_request(&Method::GET, "/");
    assert!(outbound.pending_mut().is_some_and(|record| record.state() == Lifecycle::Ready));
    outbound.record_write(16);
    outbound.finish_request();

    for byte in b"HTTP/1.1 200 OK\r\n" {
        tap.deliver_byte(*byte);
    }
    // status line recognized, message still open
    let active = tap.active().unwrap();
    assert_eq!(active.status_code(), 200);
    assert_eq!(active.state(), Lifecycle::Sent);
    assert_eq!(completed.lock().unwrap().len(), 0);

    for byte in b"\r\n" {
        tap.deliver_byte(*byte);
    }

    let exports = completed.lock().unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].status_code, 200);
    assert_eq!(exports[0].protocol, "HTTP/1.1");
    assert_eq!(exports[0].bytes_received, 0);
    assert!(tap.active().is_none());
}

#[test]
fn timestamps_are_monotonic_per_phase() {
    let clock = Arc::new(ManualClock::at(10_000));
    let (mut tap, completed) = observed_tap(Arc::clone(&clock));

    let mut outbound = tap.outbound();
    outbound.start_request(&Method::POST, "/upload");
    if let Some(record) = outbound.pending_mut() {
        record.set_dns_lookup_start(9_800);
        record.set_dns_lookup_end(9_850);
        record.set_connect_start(9_850);
        record.set_connect_end(9_900);
        record.set_handshake_start(9_900);
        record.set_handshake_end(9_990);
    }
    outbound.record_write(2_048);
    clock.set(10_040);
    outbound.finish_request();

    clock.set(10_100);
    tap.deliver(b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\n");
    clock.set(10_130);
    tap.deliver(b"ok");

    let exports = completed.lock().unwrap();
    let data = &exports[0];
    for duration in [
        data.dns_time,
        data.connect_time,
        data.handshake_time,
        data.request_time,
        data.wait_time,
        data.first_byte_time,
        data.receive_time,
        data.response_time,
    ] {
        assert!(duration >= 0, "phase duration went negative: {data:?}");
    }
    assert_eq!(data.dns_time, 50);
    assert_eq!(data.handshake_time, 90);
    assert_eq!(data.request_time, 40);
    assert_eq!(data.wait_time, 60);
    assert_eq!(data.first_byte_time, 100);
    assert_eq!(data.receive_time, 30);
}

#[test]
fn unmeasured_phases_export_the_sentinel() {
    let clock = Arc::new(ManualClock::at(0));
    let (mut tap, completed) = observed_tap(clock);

    // no write side at all: a best-effort record is created on the fly
    tap.deliver(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

    let exports = completed.lock().unwrap();
    let data = &exports[0];
    assert_eq!(data.dns_time, UNSET);
    assert_eq!(data.connect_time, UNSET);
    assert_eq!(data.handshake_time, UNSET);
    assert_eq!(data.request_time, UNSET);
    assert_eq!(data.wait_time, UNSET);
    assert_eq!(data.first_byte_time, UNSET);
    assert_eq!(data.bytes_sent, UNSET);
    assert_eq!(data.bytes_received, 0);
}

#[test]
fn reuse_produces_distinct_finalized_records() {
    let clock = Arc::new(ManualClock::at(100));
    let (mut tap, completed) = observed_tap(clock);

    tap.deliver(b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nx");
    {
        let exports = completed.lock().unwrap();
        assert_eq!(exports.len(), 1, "first transaction delivered before second begins");
    }

    tap.deliver(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n");

    let exports = completed.lock().unwrap();
    assert_eq!(exports.len(), 2);
    assert_eq!(exports[0].status_code, 200);
    assert_eq!(exports[1].status_code, 500);
    assert!(!exports[0].socket_reuse);
    assert!(exports[1].socket_reuse);
}

#[test]
fn overflow_falls_back_to_passthrough_without_raising() {
    let clock = Arc::new(ManualClock::at(0));
    let (mut tap, completed) = observed_tap(clock);

    // 100 undelimited bytes against the 64-byte status line cap
    let outcome = tap.deliver(&[b'a'; 100]);
    assert!(outcome.is_degraded());
    assert!(tap.is_passthrough());

    // bytes keep being relayed and counted, no further interpretation
    assert_eq!(tap.deliver(b"HTTP/1.1 200 OK\r\n\r\n"), FeedOutcome::Ok);
    assert!(completed.lock().unwrap().is_empty());
}

#[test]
fn pipelining_correlates_across_threads() {
    let clock = Arc::new(ManualClock::at(5_000));
    let (mut tap, completed) = observed_tap(clock);
    let outbound = tap.outbound();

    // request side runs on its own thread, response side on this one
    let writer = thread::spawn(move || {
        let mut outbound = outbound;
        for path in ["/a", "/b", "/c"] {
            outbound.start_request(&Method::GET, path);
            outbound.record_write(32);
            outbound.finish_request();
        }
    });
    writer.join().unwrap();

    for _ in 0..3 {
        tap.deliver(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }

    let exports = completed.lock().unwrap();
    let paths: Vec<&str> = exports.iter().map(|data| data.path_and_query.as_str()).collect();
    assert_eq!(paths, vec!["/a", "/b", "/c"]);
}

#[test]
fn close_finalizes_open_message_with_error_context() {
    let facts = ConnectionFacts::new("example.com", "93.184.216.34", 80);
    let mut tap = ConnectionTap::with_clock(facts, Arc::new(ManualClock::at(100)));
    let collector = Collector::default();
    let completed = Arc::clone(&collector.completed);
    let errors = Arc::clone(&collector.errors);
    tap.add_listener(Box::new(collector));

    tap.deliver(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial body");
    tap.notify_error("connection reset by peer");
    tap.notify_closing();

    assert_eq!(errors.lock().unwrap().as_slice(), ["connection reset by peer"]);
    let exports = completed.lock().unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].bytes_received, 12);
    assert_eq!(exports[0].error.as_deref(), Some("connection reset by peer"));
}
