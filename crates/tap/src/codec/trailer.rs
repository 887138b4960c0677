//! Trailer-section parser state.
//!
//! After the final chunk of a chunked body, trailer fields may follow; the
//! empty line that ends them ends the whole message. Trailer contents are
//! read and discarded, only the message boundary matters here.

use crate::codec::LineBuffer;
use crate::codec::ParseError;

const INITIAL_LENGTH_TRAILER_LINE: usize = 8;
const MAX_LENGTH_TRAILER_LINE: usize = 128;

/// Parser for the trailer section closing a chunked message.
#[derive(Debug)]
pub struct TrailerParser {
    buffer: LineBuffer,
}

impl TrailerParser {
    pub fn new() -> Self {
        Self { buffer: LineBuffer::with_capacity(INITIAL_LENGTH_TRAILER_LINE, MAX_LENGTH_TRAILER_LINE) }
    }

    /// Appends one byte; `Ok(true)` when a full trailer line is buffered.
    pub fn push(&mut self, byte: u8) -> Result<bool, ParseError> {
        self.buffer.push(byte)
    }

    /// Appends up to one line from `src`; see [`LineBuffer::extend`].
    pub fn extend(&mut self, src: &[u8]) -> Result<(usize, bool), ParseError> {
        self.buffer.extend(src)
    }

    /// Interprets the buffered line: `true` means the empty line was reached
    /// and the message is over, `false` discards a trailer field and waits
    /// for the next line.
    pub fn on_line(&mut self) -> bool {
        if self.buffer.is_blank() {
            return true;
        }
        self.buffer.clear();
        false
    }
}
