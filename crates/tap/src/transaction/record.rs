//! Mutable per-exchange record.
//!
//! One record accompanies each logical request/response exchange from the
//! moment the request starts transmitting until the response is fully parsed.
//! All timing fields are milliseconds since the UNIX epoch with [`UNSET`]
//! marking "not measured" — a real zero duration and an unmeasured one must
//! stay distinguishable.

use std::fmt;

use crate::transaction::TransactionData;

/// Sentinel meaning "value not measured".
pub const UNSET: i64 = -1;

/// URL scheme of the observed connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Exchange lifecycle, strictly forward-moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Created, request not yet on the wire
    Ready,
    /// Request transmitted, response pending
    Sent,
    /// Response fully observed; terminal
    Complete,
}

/// State of one observed HTTP(S) transaction.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    // identity
    host: String,
    ip: String,
    scheme: Scheme,
    protocol: String,
    port: i32,
    path_and_query: String,
    request_method: String,
    status_code: i32,

    // byte counters
    bytes_sent: i64,
    bytes_received: i64,

    // timing: dns -> connect -> handshake -> request -> wait -> receive
    dns_lookup_start: i64,
    dns_lookup_end: i64,
    connect_start: i64,
    connect_end: i64,
    handshake_start: i64,
    handshake_end: i64,
    request_start: i64,
    request_end: i64,
    response_start: i64,
    response_end: i64,

    // optional
    error: Option<String>,
    socket_reuse: bool,

    state: Lifecycle,
}

impl Default for TransactionRecord {
    fn default() -> Self {
        Self {
            host: String::new(),
            ip: String::new(),
            scheme: Scheme::Http,
            protocol: String::new(),
            port: -1,
            path_and_query: String::new(),
            request_method: String::new(),
            status_code: -1,
            bytes_sent: UNSET,
            bytes_received: UNSET,
            dns_lookup_start: UNSET,
            dns_lookup_end: UNSET,
            connect_start: UNSET,
            connect_end: UNSET,
            handshake_start: UNSET,
            handshake_end: UNSET,
            request_start: UNSET,
            request_end: UNSET,
            response_start: UNSET,
            response_end: UNSET,
            error: None,
            socket_reuse: false,
            state: Lifecycle::Ready,
        }
    }
}

impl TransactionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the record to `Sent`. Forward-only: a completed record is left
    /// untouched, calling this twice is harmless.
    pub fn mark_sent(&mut self) {
        if self.state < Lifecycle::Sent {
            self.state = Lifecycle::Sent;
        }
    }

    /// Completes the record, stamping the reception end with `now_millis` if
    /// no explicit end time was recorded. Idempotent: completing an
    /// already-complete record changes nothing.
    pub fn complete(&mut self, now_millis: i64) {
        if self.is_complete() {
            return;
        }
        self.state = Lifecycle::Complete;
        if self.response_end == UNSET {
            self.response_end = now_millis;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state >= Lifecycle::Complete
    }

    pub fn is_sent(&self) -> bool {
        self.state >= Lifecycle::Sent
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Drops connection-setup timing (connect + TLS handshake). Applied to
    /// records attached to a reused connection: setup happened for an earlier
    /// transaction and must not be attributed again.
    pub fn clear_setup_times(&mut self) {
        self.connect_start = UNSET;
        self.connect_end = UNSET;
        self.handshake_start = UNSET;
        self.handshake_end = UNSET;
    }

    /// Snapshots this record into its immutable export form, deriving the
    /// phase durations.
    pub fn to_data(&self) -> TransactionData {
        TransactionData::from_record(self)
    }

    // identity accessors

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn set_ip(&mut self, ip: impl Into<String>) {
        self.ip = ip.into();
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) {
        self.protocol = protocol.into();
    }

    pub fn port(&self) -> i32 {
        self.port
    }

    pub fn set_port(&mut self, port: i32) {
        self.port = port;
    }

    pub fn path_and_query(&self) -> &str {
        &self.path_and_query
    }

    pub fn set_path_and_query(&mut self, path_and_query: impl Into<String>) {
        self.path_and_query = path_and_query.into();
    }

    pub fn request_method(&self) -> &str {
        &self.request_method
    }

    pub fn set_request_method(&mut self, request_method: impl Into<String>) {
        self.request_method = request_method.into();
    }

    pub fn status_code(&self) -> i32 {
        self.status_code
    }

    pub fn set_status_code(&mut self, status_code: i32) {
        self.status_code = status_code;
    }

    // byte counters

    pub fn bytes_sent(&self) -> i64 {
        self.bytes_sent
    }

    pub fn set_bytes_sent(&mut self, bytes_sent: i64) {
        self.bytes_sent = bytes_sent;
    }

    pub fn bytes_received(&self) -> i64 {
        self.bytes_received
    }

    pub fn set_bytes_received(&mut self, bytes_received: i64) {
        self.bytes_received = bytes_received;
    }

    // timing accessors, one pair per phase

    pub fn dns_lookup_start(&self) -> i64 {
        self.dns_lookup_start
    }

    pub fn set_dns_lookup_start(&mut self, at: i64) {
        self.dns_lookup_start = at;
    }

    pub fn dns_lookup_end(&self) -> i64 {
        self.dns_lookup_end
    }

    pub fn set_dns_lookup_end(&mut self, at: i64) {
        self.dns_lookup_end = at;
    }

    pub fn connect_start(&self) -> i64 {
        self.connect_start
    }

    pub fn set_connect_start(&mut self, at: i64) {
        self.connect_start = at;
    }

    pub fn connect_end(&self) -> i64 {
        self.connect_end
    }

    pub fn set_connect_end(&mut self, at: i64) {
        self.connect_end = at;
    }

    pub fn handshake_start(&self) -> i64 {
        self.handshake_start
    }

    pub fn set_handshake_start(&mut self, at: i64) {
        self.handshake_start = at;
    }

    pub fn handshake_end(&self) -> i64 {
        self.handshake_end
    }

    pub fn set_handshake_end(&mut self, at: i64) {
        self.handshake_end = at;
    }

    pub fn request_start(&self) -> i64 {
        self.request_start
    }

    pub fn set_request_start(&mut self, at: i64) {
        self.request_start = at;
    }

    pub fn request_end(&self) -> i64 {
        self.request_end
    }

    pub fn set_request_end(&mut self, at: i64) {
        self.request_end = at;
    }

    pub fn response_start(&self) -> i64 {
        self.response_start
    }

    pub fn set_response_start(&mut self, at: i64) {
        self.response_start = at;
    }

    pub fn response_end(&self) -> i64 {
        self.response_end
    }

    pub fn set_response_end(&mut self, at: i64) {
        self.response_end = at;
    }

    // optional fields

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn socket_reuse(&self) -> bool {
        self.socket_reuse
    }

    pub fn set_socket_reuse(&mut self, socket_reuse: bool) {
        self.socket_reuse = socket_reuse;
    }
}
