//! Header-section parser state.
//!
//! Consumes `"Name: Value"` lines until the empty line that closes the header
//! section, then decides how the message body is framed: chunked transfer
//! coding when it is the final transfer coding, an explicit `Content-Length`
//! count otherwise, close-delimited when a non-chunked transfer coding was
//! declared. A message declaring no framing at all ends at the header
//! boundary. Status codes that forbid a body (1xx, 204, 304) and responses
//! to `HEAD` short-circuit to the empty framing.
//!
//! # Limits
//!
//! - Maximum header section size: 8KB
//!
//! A section exceeding the limit is a structural fault, handled by the owner
//! as a permanent fallback to pass-through.

use tracing::trace;

use crate::codec::LineBuffer;
use crate::codec::ParseError;
use crate::handler::ParseEvents;
use crate::ensure;

const INITIAL_LENGTH_HEADER_LINE: usize = 128;
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// How the body of the current message is delimited.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    /// No body follows the header section.
    Empty,
    /// Body of a declared number of bytes.
    Length(u64),
    /// Body in chunked transfer coding.
    Chunked,
    /// Body extends until the connection closes.
    UntilClose,
}

/// Parser for the response header section.
#[derive(Debug)]
pub struct HeaderParser {
    buffer: LineBuffer,
    status_code: u16,
    bytes_read: usize,
    content_length: Option<u64>,
    transfer_encoding_seen: bool,
    chunked: bool,
}

impl HeaderParser {
    pub fn new(status_code: u16) -> Self {
        Self {
            buffer: LineBuffer::with_capacity(INITIAL_LENGTH_HEADER_LINE, MAX_HEADER_BYTES),
            status_code,
            bytes_read: 0,
            content_length: None,
            transfer_encoding_seen: false,
            chunked: false,
        }
    }

    /// Appends one byte; `Ok(true)` when a full header line is buffered.
    ///
    /// The 8KB cap applies to the whole section, counted across lines.
    pub fn push(&mut self, byte: u8) -> Result<bool, ParseError> {
        self.bytes_read += 1;
        ensure!(self.bytes_read <= MAX_HEADER_BYTES, ParseError::buffer_overflow(self.bytes_read, MAX_HEADER_BYTES));
        self.buffer.push(byte)
    }

    /// Appends up to one line from `src`, counted against the section cap;
    /// see [`LineBuffer::extend`].
    pub fn extend(&mut self, src: &[u8]) -> Result<(usize, bool), ParseError> {
        let (taken, complete) = self.buffer.extend(src)?;
        self.bytes_read += taken;
        ensure!(self.bytes_read <= MAX_HEADER_BYTES, ParseError::buffer_overflow(self.bytes_read, MAX_HEADER_BYTES));
        Ok((taken, complete))
    }

    /// Total bytes consumed by the header section so far.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Interprets the buffered line.
    ///
    /// - A header line records its framing hints, reports the pair through
    ///   `events`, and returns `Ok(None)`: more headers follow.
    /// - The empty line closes the section and returns the framing decision.
    ///
    /// # Errors
    ///
    /// An unparseable `Content-Length`, or chunked coding combined with an
    /// explicit length, is a structural fault.
    pub fn on_line(&mut self, events: &mut dyn ParseEvents) -> Result<Option<Framing>, ParseError> {
        if self.buffer.is_blank() {
            return self.end_of_section(events).map(Some);
        }

        let line = self.buffer.text();
        if let Some((raw_name, raw_value)) = line.split_once(':') {
            let name = raw_name.trim();
            let value = raw_value.trim();
            trace!(name, value, "header line");
            if name.eq_ignore_ascii_case("content-length") {
                let length = value
                    .parse::<u64>()
                    .map_err(|_| ParseError::invalid_content_length(format!("value {value} is not u64")))?;
                self.content_length = Some(length);
            } else if name.eq_ignore_ascii_case("transfer-encoding") {
                self.transfer_encoding_seen = true;
                self.chunked = is_chunked(value);
            }
            events.header_found(name, value);
        } else {
            // tolerated: counted but carries no framing information
            trace!(line = %line, "header line without separator, ignored");
        }
        drop(line);

        self.buffer.clear();
        Ok(None)
    }

    fn end_of_section(&self, events: &mut dyn ParseEvents) -> Result<Framing, ParseError> {
        if !may_have_body(self.status_code) {
            return Ok(Framing::Empty);
        }
        let head_response = events.request_method().is_some_and(|method| method.eq_ignore_ascii_case("HEAD"));
        if head_response {
            return Ok(Framing::Empty);
        }

        // refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
        match (self.transfer_encoding_seen, self.content_length) {
            (true, Some(_)) => {
                Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
            }
            (true, None) => {
                if self.chunked {
                    Ok(Framing::Chunked)
                } else {
                    // a declared non-chunked coding leaves the body
                    // close-delimited
                    Ok(Framing::UntilClose)
                }
            }
            (false, Some(0)) => Ok(Framing::Empty),
            (false, Some(length)) => Ok(Framing::Length(length)),
            (false, None) => Ok(Framing::Empty),
        }
    }
}

/// Responses that carry no body regardless of framing headers.
fn may_have_body(status_code: u16) -> bool {
    !matches!(status_code, 100..=199 | 204 | 304)
}

/// Checks whether the transfer coding list ends with `chunked`.
///
/// Chunked must be the final coding if present; anything else leaves the
/// message close-delimited.
fn is_chunked(value: &str) -> bool {
    value.rsplit(',').next().map(str::trim).is_some_and(|coding| coding.eq_ignore_ascii_case("chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::RecordingEvents;

    fn run_section(parser: &mut HeaderParser, section: &[u8], events: &mut RecordingEvents) -> Result<Option<Framing>, ParseError> {
        let mut outcome = Ok(None);
        for byte in section {
            if parser.push(*byte)? {
                outcome = parser.on_line(events);
                if let Ok(Some(_)) | Err(_) = outcome {
                    return outcome;
                }
            }
        }
        outcome
    }

    #[test]
    fn check_is_chunked() {
        assert!(is_chunked("chunked"));
        assert!(is_chunked("gzip, chunked"));
        assert!(is_chunked("gzip, Chunked"));
        assert!(!is_chunked("chunked, gzip"));
        assert!(!is_chunked("gzip"));
    }

    #[test]
    fn content_length_framing() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let framing = run_section(&mut parser, b"Content-Length: 12\r\nServer: tap\r\n\r\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::Length(12)));
        assert_eq!(events.headers.len(), 2);
        assert_eq!(events.headers[0], ("Content-Length".to_owned(), "12".to_owned()));
    }

    #[test]
    fn zero_content_length_is_empty() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let framing = run_section(&mut parser, b"Content-Length: 0\r\n\r\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::Empty));
    }

    #[test]
    fn chunked_framing_wins_as_final_coding() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let framing = run_section(&mut parser, b"Transfer-Encoding: gzip, chunked\r\n\r\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::Chunked));
    }

    #[test]
    fn no_framing_headers_end_at_section() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let framing = run_section(&mut parser, b"Server: tap\r\n\r\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::Empty));
    }

    #[test]
    fn non_chunked_coding_extends_to_close() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let framing = run_section(&mut parser, b"Transfer-Encoding: gzip\r\n\r\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::UntilClose));
    }

    #[test]
    fn bodiless_status_overrides_headers() {
        let mut parser = HeaderParser::new(304);
        let mut events = RecordingEvents::default();
        let framing = run_section(&mut parser, b"Content-Length: 99\r\n\r\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::Empty));
    }

    #[test]
    fn head_response_has_no_body() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents { request_method: Some("HEAD".to_owned()), ..Default::default() };
        let framing = run_section(&mut parser, b"Content-Length: 99\r\n\r\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::Empty));
    }

    #[test]
    fn conflicting_framing_is_a_fault() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let outcome = run_section(&mut parser, b"Transfer-Encoding: chunked\r\nContent-Length: 5\r\n\r\n", &mut events);
        assert!(matches!(outcome, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn malformed_content_length_is_a_fault() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let outcome = run_section(&mut parser, b"Content-Length: twelve\r\n\r\n", &mut events);
        assert!(matches!(outcome, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn section_size_is_bounded() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let mut long_section = Vec::new();
        for index in 0..600 {
            long_section.extend_from_slice(format!("X-Filler-{index}: some filler value\r\n").as_bytes());
        }
        let outcome = run_section(&mut parser, &long_section, &mut events);
        assert!(matches!(outcome, Err(ParseError::BufferOverflow { .. })));
    }

    #[test]
    fn bare_lf_lines_are_tolerated() {
        let mut parser = HeaderParser::new(200);
        let mut events = RecordingEvents::default();
        let framing = run_section(&mut parser, b"Content-Length: 3\n\n", &mut events).unwrap();
        assert_eq!(framing, Some(Framing::Length(3)));
    }
}
