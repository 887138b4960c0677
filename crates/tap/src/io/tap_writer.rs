//! Transparent write-side stream adapter.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

use crate::tap::OutboundRecorder;

/// [`AsyncWrite`] wrapper stamping the request side of a transaction.
///
/// Each successful write is counted toward the open request record (the
/// first write of a burst opens one); a flush or shutdown marks the request
/// as fully transmitted and enqueues the record for the response side.
/// Results of the underlying stream pass through unchanged.
///
/// Adapters that know the request line should call
/// [`OutboundRecorder::start_request`] through [`TapWriter::outbound_mut`]
/// before writing, so the record carries method and path.
#[derive(Debug)]
pub struct TapWriter<W> {
    inner: W,
    outbound: OutboundRecorder,
}

impl<W> TapWriter<W> {
    pub fn new(inner: W, outbound: OutboundRecorder) -> Self {
        Self { inner, outbound }
    }

    pub fn outbound(&self) -> &OutboundRecorder {
        &self.outbound
    }

    pub fn outbound_mut(&mut self) -> &mut OutboundRecorder {
        &mut self.outbound
    }

    /// Unwraps the adapter, returning the underlying stream and the recorder.
    pub fn into_parts(self) -> (W, OutboundRecorder) {
        (self.inner, self.outbound)
    }
}

impl<W> AsyncWrite for TapWriter<W>
where
    W: AsyncWrite + Unpin,
{
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        let me = self.get_mut();
        match Pin::new(&mut me.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(written)) => {
                me.outbound.record_write(written);
                Poll::Ready(Ok(written))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let me = self.get_mut();
        match Pin::new(&mut me.inner).poll_flush(cx) {
            Poll::Ready(Ok(())) => {
                me.outbound.finish_request();
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let me = self.get_mut();
        match Pin::new(&mut me.inner).poll_shutdown(cx) {
            Poll::Ready(Ok(())) => {
                me.outbound.finish_request();
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
