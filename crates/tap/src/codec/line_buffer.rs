//! Bounded line accumulator used by the line-oriented parser states.
//!
//! Each parser state owns one of these, sized for the segment it expects: a
//! status line needs tens of bytes, a header line can legitimately reach
//! kilobytes. The buffer grows from its initial capacity as needed but never
//! past its maximum; hitting the cap is a structural fault the owning state
//! must fail closed on, not an allocation event.

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

use crate::codec::ParseError;
use crate::ensure;

/// A growable byte accumulator with a hard upper bound.
///
/// Completion is line-oriented: [`LineBuffer::push`] reports `true` once a
/// `\n` has been appended. The accumulated content stays in place until
/// [`LineBuffer::clear`], which retains the allocation so steady-state parsing
/// does not reallocate per message.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    max_size: usize,
}

impl LineBuffer {
    /// Creates a buffer with the given initial capacity and hard maximum.
    pub fn with_capacity(initial_size: usize, max_size: usize) -> Self {
        Self { buf: BytesMut::with_capacity(initial_size), max_size }
    }

    /// Appends one byte.
    ///
    /// Returns `true` when the byte completes a line (`\n`), `false` when more
    /// bytes are needed. Appending beyond the maximum capacity fails with
    /// [`ParseError::BufferOverflow`] and leaves the buffer untouched.
    pub fn push(&mut self, byte: u8) -> Result<bool, ParseError> {
        ensure!(self.buf.len() < self.max_size, ParseError::buffer_overflow(self.buf.len() + 1, self.max_size));
        self.buf.put_u8(byte);
        Ok(byte == b'\n')
    }

    /// Appends from `src` up to and including the first line terminator.
    ///
    /// Returns how many bytes were taken and whether they completed a line.
    /// Bytes past the terminator are left for the caller. Overflow behaves
    /// exactly as in [`LineBuffer::push`].
    pub fn extend(&mut self, src: &[u8]) -> Result<(usize, bool), ParseError> {
        let (take, complete) = match src.iter().position(|byte| *byte == b'\n') {
            Some(position) => (position + 1, true),
            None => (src.len(), false),
        };
        ensure!(
            self.buf.len() + take <= self.max_size,
            ParseError::buffer_overflow(self.buf.len() + take, self.max_size)
        );
        self.buf.extend_from_slice(&src[..take]);
        Ok((take, complete))
    }

    /// The accumulated content with ASCII whitespace trimmed from both ends.
    ///
    /// Borrows from the buffer when the content is valid UTF-8, which is the
    /// common case for status and header lines.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.buf.trim_ascii())
    }

    /// `true` when nothing but line terminators and whitespace accumulated.
    pub fn is_blank(&self) -> bool {
        self.buf.trim_ascii().is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Clears the content in place, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
