//! A passive HTTP/1.x wire observer with per-phase transaction timing
//!
//! This crate reconstructs the structure of HTTP request/response exchanges
//! from bytes flowing over an already-established connection, without
//! buffering or altering the payload, while measuring the timing of each
//! phase of the transaction: DNS lookup, connection establishment, secure
//! handshake, request transmission, response wait, and response reception.
//! It is built for instrumentation agents that must add near-zero overhead
//! and must never change application-visible behavior, even when parsing
//! fails.
//!
//! # Features
//!
//! - Byte-synchronous incremental parsing, tolerant of arbitrary input
//!   fragmentation (a whole message per call or one byte per call)
//! - Keep-alive and pipelining aware: any number of sequential transactions
//!   per connection, correlated to their requests in FIFO order
//! - Per-phase millisecond timing with explicit "not measured" sentinels
//! - Fail-open fault handling: the first structural fault degrades the
//!   observer into a counting pass-through, never the host's I/O path
//! - Synchronous listener fan-out with per-listener panic isolation
//! - Optional tokio stream adapters for splicing into async connections
//!
//! # Example
//!
//! ```
//! use tap_http::listener::TapListener;
//! use tap_http::tap::{ConnectionFacts, ConnectionTap};
//! use tap_http::transaction::TransactionData;
//!
//! struct LogCompleted;
//!
//! impl TapListener for LogCompleted {
//!     fn on_transaction_complete(&mut self, data: &TransactionData) {
//!         println!(
//!             "{} {} -> {} ({} bytes in {} ms to first byte)",
//!             data.request_method, data.path_and_query, data.status_code,
//!             data.bytes_received, data.first_byte_time,
//!         );
//!     }
//!
//!     fn on_transaction_error(&mut self, data: &TransactionData, error: &str) {
//!         eprintln!("{} failed: {error}", data.path_and_query);
//!     }
//! }
//!
//! // surface the tap's own diagnostics, if wanted
//! let subscriber = tracing_subscriber::FmtSubscriber::builder()
//!     .with_max_level(tracing::Level::DEBUG)
//!     .finish();
//! let _ = tracing::subscriber::set_global_default(subscriber);
//!
//! // one tap per physical connection
//! let facts = ConnectionFacts::new("example.com", "93.184.216.34", 80);
//! let mut tap = ConnectionTap::new(facts);
//! tap.add_listener(Box::new(LogCompleted));
//!
//! // the write side of the interception stamps the outgoing request
//! let mut outbound = tap.outbound();
//! outbound.start_request(&http::Method::GET, "/index.html");
//! outbound.record_write(96);
//! outbound.finish_request();
//!
//! // the read side forwards response bytes exactly as observed
//! tap.deliver(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`codec`]: the incremental parser state machine and its fault boundary
//! - [`transaction`]: the transaction record, timing model, and pending queue
//! - [`handler`]: the event contract bridging parser to transaction lifecycle
//! - [`listener`]: completion/error fan-out to reporting collaborators
//! - [`tap`]: the per-connection façade and the write-side recorder
//! - [`io`]: transparent tokio `AsyncRead`/`AsyncWrite` adapters
//!
//! # Transparency contract
//!
//! The observer sits inline on a live byte stream it does not own. Three
//! rules follow:
//!
//! 1. It never blocks and never suspends: parsing runs synchronously inside
//!    the call that delivers bytes.
//! 2. It never alters the observed bytes or the results of the underlying
//!    transport operations.
//! 3. Any internal defect degrades to "stop interpreting, keep relaying":
//!    the current parser state is permanently replaced by a pass-through
//!    state and the fault is reported as a value, never thrown.
//!
//! # Concurrency
//!
//! The request-writing and response-reading paths of one connection may run
//! on different threads; the pending-transaction queue between them is the
//! single lock-guarded resource. Everything else is owned by one side or the
//! other, and listener callbacks run synchronously on the reading thread.
//!
//! # Limitations
//!
//! - HTTP/1.x framing only (HTTP/2 and HTTP/3 are not interpreted)
//! - Response bodies are counted, not captured or decoded
//! - Maximum header section size: 8KB; status lines are capped at 64 bytes

pub mod codec;
pub mod handler;
pub mod io;
pub mod listener;
pub mod tap;
pub mod time;
pub mod transaction;

mod utils;
pub(crate) use utils::ensure;
