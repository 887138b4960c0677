//! Transparent read-side stream adapter.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tracing::debug;

use crate::codec::FeedOutcome;
use crate::tap::ConnectionTap;

/// [`AsyncRead`] wrapper feeding every observed byte to a [`ConnectionTap`].
///
/// The wrapper is invisible to the reader: results of the underlying stream
/// — data, EOF, errors — pass through unchanged. Observation is a side
/// effect: read bytes go to [`ConnectionTap::deliver`], EOF becomes
/// [`ConnectionTap::notify_closing`], and an I/O error is reported through
/// [`ConnectionTap::notify_error`] before being returned to the caller.
#[derive(Debug)]
pub struct TapReader<R> {
    inner: R,
    tap: ConnectionTap,
}

impl<R> TapReader<R> {
    pub fn new(inner: R, tap: ConnectionTap) -> Self {
        Self { inner, tap }
    }

    pub fn tap(&self) -> &ConnectionTap {
        &self.tap
    }

    pub fn tap_mut(&mut self) -> &mut ConnectionTap {
        &mut self.tap
    }

    /// Unwraps the adapter, returning the underlying stream and the tap.
    pub fn into_parts(self) -> (R, ConnectionTap) {
        (self.inner, self.tap)
    }
}

impl<R> AsyncRead for TapReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        let had_capacity = buf.remaining() > 0;
        let before = buf.filled().len();

        match Pin::new(&mut me.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let observed = &buf.filled()[before..];
                if observed.is_empty() {
                    if had_capacity {
                        // zero bytes into a non-empty buffer is end of stream
                        me.tap.notify_closing();
                    }
                } else if let FeedOutcome::Degraded { reason } = me.tap.deliver(observed) {
                    debug!(reason = %reason, "observation degraded to pass-through");
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(error)) => {
                me.tap.notify_error(&error.to_string());
                Poll::Ready(Err(error))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
