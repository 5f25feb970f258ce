//! In-memory byte pipe implementing the `futures` I/O traits.
//!
//! Each `write` becomes one chunk on an unbounded channel; the read half
//! yields those chunks in order and reports EOF once the write half is
//! closed or dropped.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::io::{AsyncBufRead, AsyncWrite};
use futures::{StreamExt, TryStreamExt};

/// Write half of a [`pipe`].
#[derive(Debug)]
pub struct PipeWriter {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl AsyncWrite for PipeWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.tx.unbounded_send(buf.to_vec()) {
            Ok(()) => Poll::Ready(Ok(buf.len())),
            Err(_) => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pipe reader dropped",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.tx.close_channel();
        Poll::Ready(Ok(()))
    }
}

/// Creates a connected (writer, reader) pair.
pub fn pipe() -> (PipeWriter, impl AsyncBufRead + Send + Unpin + 'static) {
    let (tx, rx) = mpsc::unbounded();
    let reader = rx.map(Ok::<_, io::Error>).into_async_read();
    (PipeWriter { tx }, reader)
}
