//! Counter for close-delimited bodies.
//!
//! A response without `Content-Length` or chunked coding extends until the
//! peer closes the connection (RFC 9112 §6.3). Everything observed from here
//! on is body; the connection-close notification finalizes the message.

/// Counts a body that ends only when the connection does.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UntilCloseBodyParser {
    observed: u64,
}

impl UntilCloseBodyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes the whole slice to the body.
    pub fn consume(&mut self, src: &[u8]) -> usize {
        self.observed += src.len() as u64;
        src.len()
    }

    pub fn observed(&self) -> u64 {
        self.observed
    }
}
