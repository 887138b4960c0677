use thiserror::Error;

/// Structural faults raised while interpreting an observed message.
///
/// These errors never cross the delivery boundary: the parser converts the
/// first one into a permanent switch to the pass-through state and reports it
/// to the caller as a degraded outcome. The observed byte stream itself is
/// unaffected.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line exceeds buffer limit, accumulated: {accumulated} exceed the limit {max_size}")]
    BufferOverflow { accumulated: usize, max_size: usize },

    #[error("invalid chunk size line: {reason}")]
    InvalidChunkSize { reason: String },

    #[error("invalid chunk framing: {reason}")]
    InvalidChunkFraming { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },
}

impl ParseError {
    pub fn buffer_overflow(accumulated: usize, max_size: usize) -> Self {
        Self::BufferOverflow { accumulated, max_size }
    }

    pub fn invalid_chunk_size<S: ToString>(str: S) -> Self {
        Self::InvalidChunkSize { reason: str.to_string() }
    }

    pub fn invalid_chunk_framing<S: ToString>(str: S) -> Self {
        Self::InvalidChunkFraming { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }
}
