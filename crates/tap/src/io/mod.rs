//! Async stream adapters.
//!
//! These wrappers splice the observer into a tokio byte stream the host is
//! already using. They are strictly transparent: every result of the
//! underlying read or write — byte counts, EOF, errors — is returned
//! unchanged, and a parsing fault inside the tap can never surface as an I/O
//! failure.
//!
//! - [`TapReader`]: observes the response direction
//! - [`TapWriter`]: stamps request transmission timing and byte counts
//!
//! Hosts with their own interception mechanism can skip this module and call
//! the [`crate::tap::ConnectionTap`] delivery contract directly.

mod tap_reader;
mod tap_writer;

pub use tap_reader::TapReader;
pub use tap_writer::TapWriter;

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use http::Method;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};

    use super::*;
    use crate::handler::test_support::CollectingListener;
    use crate::tap::{ConnectionFacts, ConnectionTap};

    fn facts() -> ConnectionFacts {
        ConnectionFacts::new("example.com", "93.184.216.34", 80)
    }

    #[tokio::test]
    async fn reader_is_transparent_and_observes() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";

        let mut tap = ConnectionTap::new(facts());
        let listener = CollectingListener::default();
        let completed = Arc::clone(&listener.completed);
        tap.add_listener(Box::new(listener));

        let (mut server, client) = tokio::io::duplex(1024);
        let mut reader = TapReader::new(client, tap);

        server.write_all(response).await.unwrap();
        drop(server);

        let mut seen = Vec::new();
        reader.read_to_end(&mut seen).await.unwrap();

        // the application sees exactly the wire bytes
        assert_eq!(seen, response);

        let exports = completed.lock().unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].status_code, 200);
        assert_eq!(exports[0].bytes_received, 5);
    }

    #[tokio::test]
    async fn reader_eof_finalizes_close_delimited_body() {
        let response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\n0123456789";

        let mut tap = ConnectionTap::new(facts());
        let listener = CollectingListener::default();
        let completed = Arc::clone(&listener.completed);
        tap.add_listener(Box::new(listener));

        let (mut server, client) = tokio::io::duplex(1024);
        let mut reader = TapReader::new(client, tap);

        server.write_all(response).await.unwrap();
        drop(server);

        let mut seen = Vec::new();
        reader.read_to_end(&mut seen).await.unwrap();

        let exports = completed.lock().unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].bytes_received, 10);
    }

    #[tokio::test]
    async fn writer_counts_bytes_and_enqueues_on_flush() {
        let request = b"GET /widgets HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let tap = ConnectionTap::new(facts());
        let queue = tap.queue();
        let outbound = tap.outbound();

        let (client, mut server) = tokio::io::duplex(1024);
        let mut writer = TapWriter::new(client, outbound);

        writer.outbound_mut().start_request(&Method::GET, "/widgets");
        writer.write_all(request).await.unwrap();
        writer.flush().await.unwrap();

        let record = queue.dequeue().unwrap();
        assert_eq!(record.bytes_sent(), request.len() as i64);
        assert_eq!(record.request_method(), "GET");
        assert_eq!(record.path_and_query(), "/widgets");
        assert!(record.is_sent());

        // the peer sees exactly the written bytes
        let mut seen = vec![0_u8; request.len()];
        server.read_exact(&mut seen).await.unwrap();
        assert_eq!(seen, request);
    }

    #[tokio::test]
    async fn writer_flush_without_writes_enqueues_nothing() {
        let tap = ConnectionTap::new(facts());
        let queue = tap.queue();

        let (client, _server) = tokio::io::duplex(64);
        let mut writer = TapWriter::new(client, tap.outbound());
        writer.flush().await.unwrap();

        assert!(queue.is_empty());
    }

    /// Read end that fails with the given error kind on first poll.
    struct FailingRead(io::ErrorKind);

    impl AsyncRead for FailingRead {
        fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(self.0, "simulated transport failure")))
        }
    }

    #[tokio::test]
    async fn reader_propagates_errors_untouched_after_notifying() {
        let mut tap = ConnectionTap::new(facts());
        let listener = CollectingListener::default();
        let errors = Arc::clone(&listener.errors);
        tap.add_listener(Box::new(listener));

        let mut reader = TapReader::new(FailingRead(io::ErrorKind::ConnectionReset), tap);
        let mut buf = [0_u8; 16];
        let outcome = reader.read(&mut buf).await;

        let error = outcome.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::ConnectionReset);

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1.contains("simulated transport failure"));
    }
}
