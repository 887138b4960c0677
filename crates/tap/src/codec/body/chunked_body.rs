//! Parser state for bodies in chunked transfer coding.
//!
//! Recognizes the chunk structure specified in
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding):
//! a hexadecimal size line (optionally carrying extensions), the chunk
//! payload, and the terminating CRLF, repeated until the zero-size chunk.
//! Payload bytes are counted, never stored; the total decoded length is what
//! the transaction record ultimately reports.

use tracing::trace;

use crate::codec::LineBuffer;
use crate::codec::ParseError;
use ChunkedState::*;

const INITIAL_LENGTH_CHUNK_SIZE_LINE: usize = 16;
const MAX_LENGTH_CHUNK_SIZE_LINE: usize = 256;

/// Progress made by one [`ChunkedBodyParser::consume`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Bytes of `src` attributed to this body (structure and payload)
    pub consumed: usize,
    /// Payload bytes decoded, excluding chunk structure
    pub decoded: u64,
    /// The zero-size chunk has been seen; trailers follow
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Accumulate the chunk size line
    SizeLine,
    /// Count chunk payload bytes
    Data,
    /// Expect CR after chunk payload
    DataCr,
    /// Expect LF after chunk payload
    DataLf,
    /// Zero-size chunk seen
    Complete,
}

/// Parser for a chunked message body.
#[derive(Debug)]
pub struct ChunkedBodyParser {
    state: ChunkedState,
    size_line: LineBuffer,
    remaining: u64,
}

impl ChunkedBodyParser {
    pub fn new() -> Self {
        Self {
            state: SizeLine,
            size_line: LineBuffer::with_capacity(INITIAL_LENGTH_CHUNK_SIZE_LINE, MAX_LENGTH_CHUNK_SIZE_LINE),
            remaining: 0,
        }
    }

    /// Consumes as much of `src` as belongs to this body.
    ///
    /// Returns how far `src` was consumed, how many payload bytes that
    /// contained, and whether the final chunk was reached. Bytes past the
    /// final chunk's size line are left for the trailer state.
    ///
    /// # Errors
    ///
    /// A non-hexadecimal size line, an overlong size line, or a missing CRLF
    /// after chunk payload is a structural fault.
    pub fn consume(&mut self, src: &[u8]) -> Result<ChunkProgress, ParseError> {
        let mut consumed = 0;
        let mut decoded: u64 = 0;

        while consumed < src.len() && self.state != Complete {
            match self.state {
                SizeLine => {
                    let (taken, complete) = self.size_line.extend(&src[consumed..])?;
                    consumed += taken;
                    if complete {
                        let size = parse_chunk_size(&self.size_line.text())?;
                        self.size_line.clear();
                        if size == 0 {
                            trace!("final chunk reached");
                            self.state = Complete;
                        } else {
                            trace!(size, "chunk size parsed");
                            self.remaining = size;
                            self.state = Data;
                        }
                    }
                }

                Data => {
                    let available = (src.len() - consumed) as u64;
                    let taken = self.remaining.min(available) as usize;
                    consumed += taken;
                    decoded += taken as u64;
                    self.remaining -= taken as u64;
                    if self.remaining == 0 {
                        self.state = DataCr;
                    }
                }

                DataCr => {
                    let byte = src[consumed];
                    consumed += 1;
                    if byte != b'\r' {
                        return Err(ParseError::invalid_chunk_framing("missing CR after chunk data"));
                    }
                    self.state = DataLf;
                }

                DataLf => {
                    let byte = src[consumed];
                    consumed += 1;
                    if byte != b'\n' {
                        return Err(ParseError::invalid_chunk_framing("missing LF after chunk data"));
                    }
                    self.state = SizeLine;
                }

                Complete => {}
            }
        }

        Ok(ChunkProgress { consumed, decoded, finished: self.state == Complete })
    }
}

/// Parses the hexadecimal chunk size, discarding chunk extensions.
fn parse_chunk_size(line: &str) -> Result<u64, ParseError> {
    let size_field = line
        .split([';', ' ', '\t'])
        .next()
        .filter(|field| !field.is_empty())
        .ok_or_else(|| ParseError::invalid_chunk_size("empty size line"))?;

    u64::from_str_radix(size_field, 16)
        .map_err(|_| ParseError::invalid_chunk_size(format!("{size_field} is not a hex length")))
}
