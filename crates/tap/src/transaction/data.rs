//! Immutable transaction export.
//!
//! [`TransactionData`] is the snapshot handed to listeners once an exchange
//! completes. Phase durations are derived here, exactly once, from the
//! record's raw timestamps; they are never stored redundantly on the record
//! itself.

use tracing::debug;

use crate::transaction::record::{Scheme, TransactionRecord, UNSET};

/// Completed-transaction snapshot with derived phase durations.
///
/// Every duration is in milliseconds; [`UNSET`] (`-1`) means the phase was
/// not measured. Durations are never negative: a skewed pair of timestamps
/// degrades to `-1` rather than exporting a nonsense value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    pub host: String,
    pub ip: String,
    pub scheme: Scheme,
    pub protocol: String,
    pub port: i32,
    pub path_and_query: String,
    pub request_method: String,
    pub status_code: i32,
    pub bytes_sent: i64,
    pub bytes_received: i64,

    /// DNS resolution
    pub dns_time: i64,
    /// Connection establishment
    pub connect_time: i64,
    /// Secure-channel setup
    pub handshake_time: i64,
    /// Request transmission
    pub request_time: i64,
    /// Wait between request end and first response byte
    pub wait_time: i64,
    /// Request transmission plus wait: time to first byte
    pub first_byte_time: i64,
    /// Response reception, first byte to fully parsed
    pub receive_time: i64,
    /// Request end to fully parsed: wait plus reception
    pub response_time: i64,

    pub error: Option<String>,
    pub socket_reuse: bool,
}

impl TransactionData {
    pub(crate) fn from_record(record: &TransactionRecord) -> Self {
        let request_time = span("request", record.request_start(), record.request_end());
        let wait_time = span("response-wait", record.request_end(), record.response_start());

        let first_byte_time = if request_time != UNSET && wait_time != UNSET {
            request_time + wait_time
        } else {
            UNSET
        };

        Self {
            host: record.host().to_owned(),
            ip: record.ip().to_owned(),
            scheme: record.scheme(),
            protocol: record.protocol().to_owned(),
            port: record.port(),
            path_and_query: record.path_and_query().to_owned(),
            request_method: record.request_method().to_owned(),
            status_code: record.status_code(),
            bytes_sent: record.bytes_sent(),
            bytes_received: record.bytes_received(),
            dns_time: span("dns-lookup", record.dns_lookup_start(), record.dns_lookup_end()),
            connect_time: span("connect", record.connect_start(), record.connect_end()),
            handshake_time: span("handshake", record.handshake_start(), record.handshake_end()),
            request_time,
            wait_time,
            first_byte_time,
            receive_time: span("response-receive", record.response_start(), record.response_end()),
            response_time: span("response", record.request_end(), record.response_end()),
            error: record.error().map(str::to_owned),
            socket_reuse: record.socket_reuse(),
        }
    }
}

/// `end - start` when both endpoints were measured, [`UNSET`] otherwise.
///
/// A negative span means the two stamps came from skewed clocks; it degrades
/// to [`UNSET`] with a data-quality note instead of exporting a negative
/// duration.
fn span(phase: &str, start: i64, end: i64) -> i64 {
    if start == UNSET || end == UNSET {
        return UNSET;
    }
    if end < start {
        debug!(phase, start, end, "phase end precedes start, dropping duration");
        return UNSET;
    }
    end - start
}
