//! Bridge between parser events and the transaction lifecycle.
//!
//! The parser states know message *structure*; they hold no transaction data.
//! Everything they learn flows through [`ParseEvents`] into the
//! [`TransactionBridge`], which owns the active record for the connection,
//! correlates responses to pending requests across keep-alive reuse and
//! pipelining, and hands completed records to the listener fan-out.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::listener::{ListenerId, ListenerSet, TapListener};
use crate::tap::ConnectionFacts;
use crate::time::Clock;
use crate::transaction::{TransactionQueue, TransactionRecord};

/// Structured events emitted by the parser states.
///
/// `status_line_found` and `finished_message` drive the transaction
/// lifecycle; the remaining hooks are structural and default to no-ops.
pub trait ParseEvents {
    /// A status line was recognized: numeric code plus protocol token
    /// (e.g. `HTTP/1.1`).
    fn status_line_found(&mut self, status_code: u16, protocol: &str);

    /// A header line was recognized. Structural hook, no payload obligation.
    fn header_found(&mut self, _name: &str, _value: &str) {}

    /// The current message is fully parsed. `bytes_received` is the decoded
    /// body length; `completed_at` carries a caller-supplied completion time
    /// when one exists.
    fn finished_message(&mut self, bytes_received: u64, completed_at: Option<i64>);

    /// The request method observed on the outgoing side, when known. The
    /// header state uses this to recognize bodiless `HEAD` responses.
    fn request_method(&self) -> Option<&str> {
        None
    }
}

/// Correlates parser events to transaction records on one connection.
///
/// Exactly one record is active at a time; ownership moves to the listener
/// fan-out at completion, after which the record is immutable. Responses are
/// matched to requests in FIFO order — the pipelining contract — and a
/// response arriving with an empty queue gets a best-effort fresh record
/// rather than being dropped.
pub struct TransactionBridge {
    queue: Arc<TransactionQueue>,
    facts: ConnectionFacts,
    clock: Arc<dyn Clock>,
    listeners: ListenerSet,
    active: Option<TransactionRecord>,
    responses_seen: u32,
}

impl TransactionBridge {
    pub fn new(facts: ConnectionFacts, queue: Arc<TransactionQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, facts, clock, listeners: ListenerSet::new(), active: None, responses_seen: 0 }
    }

    /// The record currently being filled by the response side, if any.
    pub fn active(&self) -> Option<&TransactionRecord> {
        self.active.as_ref()
    }

    pub fn add_listener(&mut self, listener: Box<dyn TapListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Marks the in-flight record with a transport error and notifies error
    /// listeners. The record stays active so a later finalization still
    /// carries the description.
    pub fn stream_error(&mut self, description: &str) {
        if self.active.is_none() {
            self.active = Some(self.queue.dequeue().unwrap_or_else(|| self.facts.new_record()));
        }
        let data = {
            let Some(record) = self.active.as_mut() else { return };
            record.set_error(description);
            record.to_data()
        };
        self.listeners.notify_error(&data, description);
    }

    fn fresh_record(&self) -> TransactionRecord {
        self.facts.new_record()
    }
}

impl ParseEvents for TransactionBridge {
    /// Attaches a record to the response that just started.
    ///
    /// The oldest pending request is claimed from the queue (FIFO matches
    /// responses to requests in transmission order). On a reused connection
    /// the record is flagged and its connection-setup timing cleared: connect
    /// and handshake belong to the first transaction only. The response-wait
    /// phase ends here, with the first observed response bytes.
    fn status_line_found(&mut self, status_code: u16, protocol: &str) {
        if let Some(previous) = self.active.take() {
            if !previous.is_complete() {
                debug!(status = previous.status_code(), "dropping unfinished record on new status line");
            }
        }

        let mut record = self.queue.dequeue().unwrap_or_else(|| self.fresh_record());
        record.mark_sent();
        if self.responses_seen > 0 {
            record.set_socket_reuse(true);
            record.clear_setup_times();
        }
        record.set_status_code(i32::from(status_code));
        record.set_protocol(protocol);
        record.set_response_start(self.clock.now_millis());

        self.responses_seen += 1;
        self.active = Some(record);
    }

    /// Finalizes the active record and hands it to the listeners.
    ///
    /// Without an active record the event is dropped: the stream may close
    /// before any byte was parsed, and that is not an error.
    fn finished_message(&mut self, bytes_received: u64, completed_at: Option<i64>) {
        let Some(mut record) = self.active.take() else {
            debug!(bytes_received, "finished message without active record, dropped");
            return;
        };
        if record.is_complete() {
            return;
        }

        record.set_bytes_received(bytes_received as i64);
        if let Some(at) = completed_at {
            record.set_response_end(at);
        }
        record.complete(self.clock.now_millis());

        let data = record.to_data();
        self.listeners.notify_complete(&data);
    }

    fn request_method(&self) -> Option<&str> {
        self.active.as_ref().map(TransactionRecord::request_method).filter(|method| !method.is_empty())
    }
}

impl fmt::Debug for TransactionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionBridge")
            .field("facts", &self.facts)
            .field("active", &self.active)
            .field("responses_seen", &self.responses_seen)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
