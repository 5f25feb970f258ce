//! `Content-Length` message framing.
//!
//! Every message on the wire is a header block terminated by an empty line,
//! followed by exactly `Content-Length` bytes of payload:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//!
//! The transport only moves payload bytes. It knows nothing about JSON-RPC.
//! Both halves are generic over the `futures` I/O traits so they run over a
//! child process's stdio as well as over in-memory pipes.

use futures::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::TransportError;

/// Largest payload accepted from the peer.
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Longest header line accepted from the peer, terminator included.
pub const MAX_HEADER_LINE: usize = 8 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";

/// Frames a payload with its `Content-Length` header.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", payload.len());
    let mut frame = Vec::with_capacity(header.len() + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload);
    frame
}

fn parse_content_length(value: &str) -> Result<usize, TransportError> {
    let value = value.trim();
    let length = value
        .parse::<usize>()
        .map_err(|_| TransportError::InvalidContentLength(value.to_string()))?;

    if length > MAX_CONTENT_LENGTH {
        return Err(TransportError::MessageTooLarge {
            size: length,
            max: MAX_CONTENT_LENGTH,
        });
    }

    Ok(length)
}

/// Read half of the framed transport.
#[derive(Debug)]
pub struct FramedReader<R> {
    inner: R,
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FramedReader<R> {
    /// Wraps a buffered byte stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::new(),
        }
    }

    /// Reads the next complete frame and returns its payload.
    ///
    /// Blocks until a full frame is available.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] if the stream ends between
    /// frames, an `Incomplete*` error if it ends inside one, and a header
    /// error if `Content-Length` is missing, unparsable or too large.
    pub async fn read_message(&mut self) -> Result<Vec<u8>, TransportError> {
        let length = self.read_header().await?;

        let mut payload = vec![0u8; length];
        self.inner
            .read_exact(&mut payload)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => {
                    TransportError::IncompletePayload { expected: length }
                }
                _ => TransportError::Io(e),
            })?;

        trace!(bytes = length, "read frame");
        Ok(payload)
    }

    /// Consumes header lines up to the empty separator line.
    async fn read_header(&mut self) -> Result<usize, TransportError> {
        let mut content_length = None;
        let mut started = false;

        loop {
            self.line.clear();
            let read = (&mut self.inner)
                .take(MAX_HEADER_LINE as u64)
                .read_until(b'\n', &mut self.line)
                .await?;
            if read == 0 {
                return Err(if started {
                    TransportError::IncompleteHeader
                } else {
                    TransportError::ConnectionClosed
                });
            }
            if read == MAX_HEADER_LINE && !self.line.ends_with(b"\n") {
                return Err(TransportError::HeaderTooLong {
                    max: MAX_HEADER_LINE,
                });
            }
            started = true;

            let text = String::from_utf8_lossy(&self.line);
            let text = text.trim();
            if text.is_empty() {
                break;
            }

            // Unknown headers and lines without a colon are skipped.
            if let Some((name, value)) = text.split_once(':')
                && name.trim().eq_ignore_ascii_case(CONTENT_LENGTH)
            {
                content_length = Some(parse_content_length(value)?);
            }
        }

        content_length.ok_or(TransportError::MissingContentLength)
    }
}

/// Write half of the framed transport.
///
/// Writes are serialized: a frame is written and flushed while holding the
/// lock, so concurrent writers never interleave.
#[derive(Debug)]
pub struct FramedWriter<W> {
    inner: Mutex<Option<W>>,
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    /// Wraps a byte sink.
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(Some(inner)),
        }
    }

    /// Writes one framed message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::WriterClosed`] after [`close`](Self::close),
    /// or the underlying I/O error.
    pub async fn write_message(&self, payload: &[u8]) -> Result<(), TransportError> {
        let frame = encode_frame(payload);

        let mut guard = self.inner.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::WriterClosed)?;
        writer.write_all(&frame).await?;
        writer.flush().await?;

        trace!(bytes = payload.len(), "wrote frame");
        Ok(())
    }

    /// Closes the sink. Later writes fail with [`TransportError::WriterClosed`].
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while closing the sink.
    pub async fn close(&self) -> Result<(), TransportError> {
        let taken = self.inner.lock().await.take();
        if let Some(mut writer) = taken {
            writer.close().await?;
        }
        Ok(())
    }

    /// Returns the sink, or `None` if it was closed.
    pub fn into_inner(self) -> Option<W> {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;
    use std::sync::Arc;

    fn reader(bytes: impl Into<Vec<u8>>) -> FramedReader<Cursor<Vec<u8>>> {
        FramedReader::new(Cursor::new(bytes.into()))
    }

    #[test]
    fn test_encode_frame() {
        let message = br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let frame = encode_frame(message);

        let mut expected = format!("Content-Length: {}\r\n\r\n", message.len()).into_bytes();
        expected.extend_from_slice(message);
        assert_eq!(frame, expected);
    }

    #[tokio::test]
    async fn test_round_trip_empty_payload() {
        let mut framed = reader(encode_frame(b""));
        let payload = framed.read_message().await.unwrap();
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_multibyte_payload() {
        let text = "héllo wörld ✓ 日本語 🦀 ".repeat(400);
        assert!(text.len() > 8 * 1024);

        let writer = FramedWriter::new(Vec::new());
        writer.write_message(text.as_bytes()).await.unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut framed = reader(bytes);
        let payload = framed.read_message().await.unwrap();
        assert_eq!(payload.len(), text.len());
        assert_eq!(String::from_utf8(payload).unwrap(), text);
    }

    #[tokio::test]
    async fn test_read_multiple_frames_from_one_buffer() {
        let first = br#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        let second = br#"{"jsonrpc":"2.0","method":"exit"}"#;
        let mut bytes = encode_frame(first);
        bytes.extend(encode_frame(second));

        let mut framed = reader(bytes);
        assert_eq!(framed.read_message().await.unwrap(), first);
        assert_eq!(framed.read_message().await.unwrap(), second);
        assert!(matches!(
            framed.read_message().await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_extra_and_malformed_headers_are_ignored() {
        let body = b"{}";
        let bytes = format!(
            "Content-Type: application/vscode-jsonrpc; charset=utf-8\r\n\
             garbage line\r\n\
             content-length: {}\r\n\r\n{{}}",
            body.len()
        );

        let mut framed = reader(bytes);
        assert_eq!(framed.read_message().await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_missing_content_length() {
        let mut framed = reader("Content-Type: text/plain\r\n\r\n{}");
        assert!(matches!(
            framed.read_message().await,
            Err(TransportError::MissingContentLength)
        ));
    }

    #[tokio::test]
    async fn test_invalid_content_length() {
        let mut framed = reader("Content-Length: invalid\r\n\r\n{}");
        match framed.read_message().await {
            Err(TransportError::InvalidContentLength(value)) => assert_eq!(value, "invalid"),
            other => panic!("Expected InvalidContentLength error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let size = MAX_CONTENT_LENGTH + 1;
        let mut framed = reader(format!("Content-Length: {size}\r\n\r\n"));
        match framed.read_message().await {
            Err(TransportError::MessageTooLarge { size: got, max }) => {
                assert_eq!(got, size);
                assert_eq!(max, MAX_CONTENT_LENGTH);
            }
            other => panic!("Expected MessageTooLarge error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unterminated_header_line_is_capped() {
        let mut bytes = b"Content-Length: 2\r\nX-Padding: ".to_vec();
        bytes.extend(vec![b'x'; 4 * MAX_HEADER_LINE]);
        let result = reader(bytes).read_message().await;
        assert!(matches!(
            result,
            Err(TransportError::HeaderTooLong { max }) if max == MAX_HEADER_LINE
        ));
    }

    #[tokio::test]
    async fn test_long_header_line_within_limit() {
        let padding = "y".repeat(MAX_HEADER_LINE - 64);
        let bytes = format!("X-Padding: {padding}\r\nContent-Length: 2\r\n\r\n{{}}");
        let payload = reader(bytes).read_message().await.unwrap();
        assert_eq!(payload, b"{}");
    }

    #[tokio::test]
    async fn test_stream_closed_mid_header() {
        let mut framed = reader("Content-Length: 10\r\n");
        assert!(matches!(
            framed.read_message().await,
            Err(TransportError::IncompleteHeader)
        ));
    }

    #[tokio::test]
    async fn test_stream_closed_mid_payload() {
        let mut framed = reader("Content-Length: 10\r\n\r\n{\"a\"");
        assert!(matches!(
            framed.read_message().await,
            Err(TransportError::IncompletePayload { expected: 10 })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_writes_do_not_interleave() {
        let writer = Arc::new(FramedWriter::new(Vec::new()));
        let payloads: Vec<String> = (0..16)
            .map(|i| format!("{{\"id\":{i},\"pad\":\"{}\"}}", "x".repeat(i * 97)))
            .collect();

        let handles: Vec<_> = payloads
            .iter()
            .cloned()
            .map(|payload| {
                let writer = Arc::clone(&writer);
                tokio::spawn(async move { writer.write_message(payload.as_bytes()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let writer = Arc::try_unwrap(writer).unwrap();
        let mut framed = reader(writer.into_inner().unwrap());
        let mut received = Vec::new();
        for _ in 0..payloads.len() {
            received.push(String::from_utf8(framed.read_message().await.unwrap()).unwrap());
        }
        received.sort();
        let mut expected = payloads;
        expected.sort();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let writer = FramedWriter::new(Vec::new());
        writer.close().await.unwrap();
        assert!(matches!(
            writer.write_message(b"{}").await,
            Err(TransportError::WriterClosed)
        ));
        assert!(writer.into_inner().is_none());
    }
}
