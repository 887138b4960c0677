//! Status-line parser state.
//!
//! First state of every message: recognizes `"<version> <status> <reason>"`
//! (e.g. `HTTP/1.1 200 OK`), extracts the protocol token and the numeric
//! status code, and reports them to the handler.

use tracing::trace;

use crate::codec::LineBuffer;
use crate::codec::ParseError;
use crate::handler::ParseEvents;

const INITIAL_LENGTH_STATUS_LINE: usize = 16;
const MAX_LENGTH_STATUS_LINE: usize = 64;

/// Parser for the response status line.
#[derive(Debug)]
pub struct StatusLineParser {
    buffer: LineBuffer,
    parsed_status_code: Option<u16>,
}

impl StatusLineParser {
    pub fn new() -> Self {
        Self {
            buffer: LineBuffer::with_capacity(INITIAL_LENGTH_STATUS_LINE, MAX_LENGTH_STATUS_LINE),
            parsed_status_code: None,
        }
    }

    /// The status code extracted by a successful [`StatusLineParser::parse`].
    pub fn status_code(&self) -> Option<u16> {
        self.parsed_status_code
    }

    /// Appends one byte; `Ok(true)` when a full line is buffered.
    pub fn push(&mut self, byte: u8) -> Result<bool, ParseError> {
        self.buffer.push(byte)
    }

    /// Appends up to one line from `src`; see [`LineBuffer::extend`].
    pub fn extend(&mut self, src: &[u8]) -> Result<(usize, bool), ParseError> {
        self.buffer.extend(src)
    }

    /// Attempts to interpret the accumulated line.
    ///
    /// On success the status code and protocol token are reported through
    /// `events` and `true` is returned. A line without a status field, or
    /// whose status field is not numeric, returns `false`: the buffer keeps
    /// accumulating and either a later newline completes a parseable line or
    /// the buffer cap degrades the parser. The reason phrase is optional,
    /// servers omit it in the wild.
    pub fn parse(&mut self, events: &mut dyn ParseEvents) -> bool {
        let line = self.buffer.text();
        trace!(line = %line, "parsing status line");

        let mut fields = line.splitn(3, ' ');
        let (Some(protocol), Some(status)) = (fields.next(), fields.next()) else {
            return false;
        };

        match status.parse::<u16>() {
            Ok(status_code) => {
                self.parsed_status_code = Some(status_code);
                events.status_line_found(status_code, protocol);
                true
            }
            Err(_) => {
                trace!(status = %status, "status field is not numeric, awaiting more bytes");
                false
            }
        }
    }
}
