//! Per-connection observation façade.
//!
//! [`ConnectionTap`] ties the parser, the transaction bridge, and the pending
//! queue together for one physical connection and exposes the byte-delivery
//! contract the intercepted-transport adapter calls into:
//!
//! - [`ConnectionTap::deliver`] / [`ConnectionTap::deliver_byte`]: forward
//!   observed response bytes
//! - [`ConnectionTap::notify_closing`]: the connection is going away,
//!   finalize best-effort
//! - [`ConnectionTap::notify_error`]: the underlying transport failed
//!
//! The write side of the connection talks to the same queue through an
//! [`OutboundRecorder`], which may live on a different thread.
//!
//! # Example
//!
//! ```
//! use tap_http::tap::{ConnectionFacts, ConnectionTap};
//!
//! let mut tap = ConnectionTap::new(ConnectionFacts::new("example.com", "93.184.216.34", 80));
//! // request goes out through the write side
//! let mut outbound = tap.outbound();
//! outbound.start_request(&http::Method::GET, "/index.html");
//! outbound.record_write(56);
//! outbound.finish_request();
//! // response bytes observed on the read side
//! tap.deliver(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::codec::{FeedOutcome, ResponseParser};
use crate::handler::{ParseEvents, TransactionBridge};
use crate::listener::{ListenerId, TapListener};
use crate::time::{Clock, SystemClock};
use crate::transaction::{Scheme, TransactionQueue, TransactionRecord};

/// Typed connection identity used to seed every record on a connection.
///
/// This is deliberately plain data: the intercepting adapter copies the
/// fields it knows (peer host, resolved address, port) once, instead of the
/// core reaching into transport internals.
#[derive(Debug, Clone)]
pub struct ConnectionFacts {
    pub host: String,
    pub ip: String,
    pub port: i32,
    pub scheme: Scheme,
}

impl ConnectionFacts {
    /// Facts for a connection; the scheme is inferred from the port (443 ⇒
    /// https), override with [`ConnectionFacts::with_scheme`] when the
    /// adapter knows better.
    pub fn new(host: impl Into<String>, ip: impl Into<String>, port: i32) -> Self {
        let scheme = if port == 443 { Scheme::Https } else { Scheme::Http };
        Self { host: host.into(), ip: ip.into(), port, scheme }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// A fresh record carrying this connection's identity.
    pub(crate) fn new_record(&self) -> TransactionRecord {
        let mut record = TransactionRecord::new();
        record.set_host(self.host.clone());
        record.set_ip(self.ip.clone());
        record.set_port(self.port);
        record.set_scheme(self.scheme);
        record
    }
}

/// Read-side observer for one connection.
pub struct ConnectionTap {
    parser: ResponseParser,
    bridge: TransactionBridge,
    queue: Arc<TransactionQueue>,
    facts: ConnectionFacts,
    clock: Arc<dyn Clock>,
}

impl ConnectionTap {
    pub fn new(facts: ConnectionFacts) -> Self {
        Self::with_clock(facts, Arc::new(SystemClock))
    }

    pub fn with_clock(facts: ConnectionFacts, clock: Arc<dyn Clock>) -> Self {
        let queue = Arc::new(TransactionQueue::new());
        let bridge = TransactionBridge::new(facts.clone(), Arc::clone(&queue), Arc::clone(&clock));
        Self { parser: ResponseParser::new(), bridge, queue, facts, clock }
    }

    /// Forwards observed bytes to the current parser state.
    ///
    /// Never blocks, never panics across this boundary, never changes the
    /// bytes. The outcome reports the one-time fallback to pass-through;
    /// callers decide whether to log, count, or ignore it.
    pub fn deliver(&mut self, bytes: &[u8]) -> FeedOutcome {
        self.parser.feed(bytes, &mut self.bridge)
    }

    /// Single-byte variant of [`ConnectionTap::deliver`].
    pub fn deliver_byte(&mut self, byte: u8) -> FeedOutcome {
        self.parser.feed_byte(byte, &mut self.bridge)
    }

    /// The connection is closing; finalizes any incomplete message
    /// best-effort.
    pub fn notify_closing(&mut self) {
        self.parser.close(&mut self.bridge);
    }

    /// The underlying transport operation failed; the in-flight record is
    /// marked with the description and error listeners fire.
    pub fn notify_error(&mut self, description: &str) {
        self.bridge.stream_error(description);
    }

    pub fn add_listener(&mut self, listener: Box<dyn TapListener>) -> ListenerId {
        self.bridge.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.bridge.remove_listener(id)
    }

    /// Shared handle to the pending-transaction FIFO, for adapters that
    /// enqueue on their own.
    pub fn queue(&self) -> Arc<TransactionQueue> {
        Arc::clone(&self.queue)
    }

    /// A fresh record seeded with this connection's identity, for adapters
    /// that stamp the request side themselves.
    pub fn new_outgoing(&self) -> TransactionRecord {
        self.facts.new_record()
    }

    /// Hands a request-side record to the FIFO; the matching response will
    /// claim it in order.
    pub fn enqueue_outgoing(&self, record: TransactionRecord) {
        self.queue.enqueue(record);
    }

    /// Write-side recorder bound to this connection's queue and clock. Safe
    /// to move to the thread performing the writes.
    pub fn outbound(&self) -> OutboundRecorder {
        OutboundRecorder {
            facts: self.facts.clone(),
            queue: Arc::clone(&self.queue),
            clock: Arc::clone(&self.clock),
            pending: None,
            bytes_sent: 0,
        }
    }

    /// The record currently being filled by the response side.
    pub fn active(&self) -> Option<&TransactionRecord> {
        self.bridge.active()
    }

    /// Request method observed for the transaction in flight, when known.
    pub fn request_method(&self) -> Option<&str> {
        self.bridge.request_method()
    }

    /// `true` once a structural fault has stopped interpretation; bytes are
    /// still relayed and counted.
    pub fn is_passthrough(&self) -> bool {
        self.parser.is_passthrough()
    }
}

impl fmt::Debug for ConnectionTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTap")
            .field("facts", &self.facts)
            .field("parser", &self.parser)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// Request-side recorder for one connection.
///
/// Stamps the request-transmission phase and byte count, then enqueues the
/// record for the response side to claim. The write path may run on a
/// different thread than the read path; the shared queue is the only
/// synchronization point.
pub struct OutboundRecorder {
    facts: ConnectionFacts,
    queue: Arc<TransactionQueue>,
    clock: Arc<dyn Clock>,
    pending: Option<TransactionRecord>,
    bytes_sent: u64,
}

impl OutboundRecorder {
    /// Opens a record for a request whose method and target the adapter
    /// knows. Any record still open is finished first.
    pub fn start_request(&mut self, method: &Method, path_and_query: &str) {
        self.finish_request();
        let mut record = self.facts.new_record();
        record.set_request_method(method.as_str());
        record.set_path_and_query(path_and_query);
        record.set_request_start(self.clock.now_millis());
        self.pending = Some(record);
    }

    /// Counts bytes written toward the open request, opening an anonymous
    /// record on the first write of a burst.
    pub fn record_write(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if self.pending.is_none() {
            let mut record = self.facts.new_record();
            record.set_request_start(self.clock.now_millis());
            self.pending = Some(record);
        }
        self.bytes_sent += len as u64;
    }

    /// Ends the request: stamps the transmission end, stores the byte count,
    /// and hands the record to the queue. No open record, no effect.
    pub fn finish_request(&mut self) {
        let Some(mut record) = self.pending.take() else { return };
        record.set_request_end(self.clock.now_millis());
        record.set_bytes_sent(self.bytes_sent as i64);
        record.mark_sent();
        self.queue.enqueue(record);
        self.bytes_sent = 0;
    }

    /// The record being assembled, for stamping earlier phases (DNS lookup,
    /// connect, handshake) the adapter measured itself.
    pub fn pending_mut(&mut self) -> Option<&mut TransactionRecord> {
        self.pending.as_mut()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl fmt::Debug for OutboundRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundRecorder")
            .field("facts", &self.facts)
            .field("pending", &self.pending)
            .field("bytes_sent", &self.bytes_sent)
            .finish_non_exhaustive()
    }
}
