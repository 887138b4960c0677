//! Response parser driver.
//!
//! Owns the current parser state as a value and advances it as observed bytes
//! arrive, in arbitrary fragmentation — a whole response in one slice or one
//! byte per call produce the identical event sequence. The driver is the
//! crate's fault boundary: the first structural fault permanently replaces the
//! current state with the pass-through state and is reported to the caller as
//! a degraded outcome; nothing is ever raised across a delivery call.
//!
//! # State machine
//!
//! ```text
//! StatusLine -> Header -> FixedBody ---------------+--> (finished) -> StatusLine
//!                      -> ChunkedBody -> Trailer --+
//!                      -> UntilClose  -- close() --+
//!                      -> (finished, empty framing)+
//! any state --(structural fault)--> Noop (terminal)
//! ```

use tracing::trace;

use crate::codec::body::{ChunkedBodyParser, LengthBodyParser, UntilCloseBodyParser};
use crate::codec::header::{Framing, HeaderParser};
use crate::codec::status_line::StatusLineParser;
use crate::codec::trailer::TrailerParser;
use crate::codec::ParseError;
use crate::handler::ParseEvents;

/// Result of one delivery call.
///
/// `Degraded` is returned exactly once, at the moment the parser falls back
/// to pass-through; the caller decides whether to log, count, or ignore it.
/// Byte relay is unaffected either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    Ok,
    Degraded { reason: String },
}

impl FeedOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, FeedOutcome::Degraded { .. })
    }
}

/// Terminal absorption state: counts observed bytes, interprets nothing.
#[derive(Debug, Default)]
pub struct NoopParser {
    observed: u64,
}

impl NoopParser {
    fn observe(&mut self, src: &[u8]) -> usize {
        self.observed += src.len() as u64;
        src.len()
    }
}

#[derive(Debug)]
enum ParserState {
    StatusLine(StatusLineParser),
    Header(HeaderParser),
    FixedBody(LengthBodyParser),
    ChunkedBody(ChunkedBodyParser),
    UntilClose(UntilCloseBodyParser),
    Trailer(TrailerParser),
    Noop(NoopParser),
}

impl ParserState {
    fn name(&self) -> &'static str {
        match self {
            ParserState::StatusLine(_) => "status-line",
            ParserState::Header(_) => "header",
            ParserState::FixedBody(_) => "fixed-body",
            ParserState::ChunkedBody(_) => "chunked-body",
            ParserState::UntilClose(_) => "until-close-body",
            ParserState::Trailer(_) => "trailer",
            ParserState::Noop(_) => "noop",
        }
    }
}

/// Incremental parser for the response side of a connection.
///
/// Multiplexes any number of sequential messages: reaching the end of one
/// message re-arms the status-line state for the next message on the same
/// connection.
#[derive(Debug)]
pub struct ResponseParser {
    state: ParserState,
    /// Decoded body bytes of the message currently being parsed
    body_bytes: u64,
    /// All bytes attributed to the current message, structure included
    message_bytes: u64,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self { state: ParserState::StatusLine(StatusLineParser::new()), body_bytes: 0, message_bytes: 0 }
    }

    /// Feeds one observed byte.
    pub fn feed_byte(&mut self, byte: u8, events: &mut dyn ParseEvents) -> FeedOutcome {
        self.feed(&[byte], events)
    }

    /// Feeds a slice of observed bytes.
    ///
    /// Events fire through `events` as message boundaries are recognized. The
    /// slice is always consumed in full; on a structural fault the remainder
    /// is absorbed by the pass-through state and `Degraded` is returned.
    pub fn feed(&mut self, src: &[u8], events: &mut dyn ParseEvents) -> FeedOutcome {
        let mut index = 0;
        while index < src.len() {
            match self.step(&src[index..], events) {
                Ok(consumed) => index += consumed,
                Err(error) => {
                    let reason = error.to_string();
                    trace!(state = self.state.name(), reason = %reason, "structural fault, falling back to pass-through");
                    let mut noop = NoopParser::default();
                    noop.observe(&src[index..]);
                    self.state = ParserState::Noop(noop);
                    return FeedOutcome::Degraded { reason };
                }
            }
        }
        FeedOutcome::Ok
    }

    /// Advances the current state over a non-empty slice, returning how many
    /// bytes it consumed.
    fn step(&mut self, src: &[u8], events: &mut dyn ParseEvents) -> Result<usize, ParseError> {
        let mut next = None;
        let mut finished = false;

        let consumed = match &mut self.state {
            ParserState::StatusLine(parser) => {
                let (taken, complete) = parser.extend(src)?;
                if complete && parser.parse(events) {
                    next = Some(ParserState::Header(HeaderParser::new(parser.status_code().unwrap_or_default())));
                }
                taken
            }

            ParserState::Header(parser) => {
                let (taken, complete) = parser.extend(src)?;
                if complete {
                    match parser.on_line(events)? {
                        Some(Framing::Empty) => finished = true,
                        Some(Framing::Length(length)) => {
                            next = Some(ParserState::FixedBody(LengthBodyParser::new(length)));
                        }
                        Some(Framing::Chunked) => next = Some(ParserState::ChunkedBody(ChunkedBodyParser::new())),
                        Some(Framing::UntilClose) => {
                            next = Some(ParserState::UntilClose(UntilCloseBodyParser::new()));
                        }
                        None => {}
                    }
                }
                taken
            }

            ParserState::FixedBody(parser) => {
                let taken = parser.consume(src);
                self.body_bytes += taken as u64;
                if parser.is_done() {
                    // no trailer section exists in length framing
                    finished = true;
                }
                taken
            }

            ParserState::ChunkedBody(parser) => {
                let progress = parser.consume(src)?;
                self.body_bytes += progress.decoded;
                if progress.finished {
                    next = Some(ParserState::Trailer(TrailerParser::new()));
                }
                progress.consumed
            }

            ParserState::UntilClose(parser) => {
                let taken = parser.consume(src);
                self.body_bytes += taken as u64;
                taken
            }

            ParserState::Trailer(parser) => {
                let (taken, complete) = parser.extend(src)?;
                if complete && parser.on_line() {
                    finished = true;
                }
                taken
            }

            ParserState::Noop(parser) => parser.observe(src),
        };

        self.message_bytes += consumed as u64;
        if let Some(state) = next {
            self.state = state;
        }
        if finished {
            self.finish(events);
        }
        Ok(consumed)
    }

    /// Ends the current message: reports it and re-arms for the next one.
    fn finish(&mut self, events: &mut dyn ParseEvents) {
        trace!(body_bytes = self.body_bytes, message_bytes = self.message_bytes, "message finished");
        events.finished_message(self.body_bytes, None);
        self.body_bytes = 0;
        self.message_bytes = 0;
        self.state = ParserState::StatusLine(StatusLineParser::new());
    }

    /// Best-effort finalization when the connection is closing.
    ///
    /// A close-delimited body ends here by definition; a message interrupted
    /// mid-headers or mid-body is reported with the bytes observed so far.
    /// Between messages this is a no-op.
    pub fn close(&mut self, events: &mut dyn ParseEvents) {
        match self.state {
            ParserState::Header(_)
            | ParserState::FixedBody(_)
            | ParserState::ChunkedBody(_)
            | ParserState::UntilClose(_)
            | ParserState::Trailer(_) => self.finish(events),
            ParserState::StatusLine(_) | ParserState::Noop(_) => {}
        }
    }

    /// `true` once a structural fault has switched the parser to pass-through.
    pub fn is_passthrough(&self) -> bool {
        matches!(self.state, ParserState::Noop(_))
    }

    /// Bytes observed since entering pass-through.
    pub fn passthrough_bytes(&self) -> u64 {
        match &self.state {
            ParserState::Noop(parser) => parser.observed,
            _ => 0,
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}
