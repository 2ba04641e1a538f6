//! In-memory byte pipe between the tailing producer and the console consumer
//!
//! A [`Locality::Local`] pipe is a plain duplex stream. A
//! [`Locality::Remote`] pipe forwards writes as [`Bytes`] chunks over a
//! bounded queue to a pump task that owns the local end, which models a
//! producer running in another execution context. Severing the link (or
//! dropping the reader) makes the writer fail with `BrokenPipe`.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_util::sync::PollSender;

use logrelay_core::prelude::*;
use logrelay_core::Locality;

/// Default buffer between the two ends of a pipe
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

/// Chunks queued on a remote link before the writer waits
const LINK_QUEUE_DEPTH: usize = 16;

/// Create a connected `(reader, writer)` pair.
///
/// Remote pipes spawn their pump task, so this must be called inside a
/// Tokio runtime when `locality` is [`Locality::Remote`].
pub fn create(locality: Locality, capacity: usize) -> (PipeReader, PipeWriter) {
    let capacity = capacity.max(1);
    match locality {
        Locality::Local => {
            let (write_end, read_end) = tokio::io::duplex(capacity);
            (
                PipeReader {
                    stream: read_end,
                    link: None,
                },
                PipeWriter::Local(write_end),
            )
        }
        Locality::Remote => {
            let (write_end, read_end) = tokio::io::duplex(capacity);
            let (tx, rx) = mpsc::channel::<Bytes>(LINK_QUEUE_DEPTH);
            let pump = tokio::spawn(forward_link(rx, write_end));
            debug!("Opened remote pipe link (capacity {})", capacity);
            (
                PipeReader {
                    stream: read_end,
                    link: Some(pump.abort_handle()),
                },
                PipeWriter::Remote(ForwardingWriter {
                    tx: PollSender::new(tx),
                }),
            )
        }
    }
}

/// Deliver queued chunks into the local end until the writer closes
async fn forward_link(mut rx: mpsc::Receiver<Bytes>, mut local: DuplexStream) {
    let mut forwarded = 0u64;
    while let Some(chunk) = rx.recv().await {
        if let Err(e) = local.write_all(&chunk).await {
            debug!("Remote link reader gone after {} bytes: {}", forwarded, e);
            return;
        }
        forwarded += chunk.len() as u64;
    }
    if let Err(e) = local.shutdown().await {
        debug!("Remote link shutdown error (ignored): {}", e);
    }
    trace!("Remote link closed after {} bytes", forwarded);
}

fn link_closed() -> io::Error {
    io::Error::new(
        io::ErrorKind::BrokenPipe,
        Error::transport("boundary connection closed"),
    )
}

/// Consumer end of a pipe
#[derive(Debug)]
pub struct PipeReader {
    stream: DuplexStream,
    link: Option<AbortHandle>,
}

impl PipeReader {
    pub fn locality(&self) -> Locality {
        Locality::from_is_local(self.link.is_none())
    }

    /// Drop the remote link as if the other context went away.
    ///
    /// Bytes already delivered stay readable. No-op on a local pipe.
    pub fn sever_link(&mut self) {
        if let Some(link) = self.link.take() {
            warn!("Severing remote pipe link");
            link.abort();
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            link.abort();
        }
    }
}

impl AsyncRead for PipeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

/// Producer end of a pipe
#[derive(Debug)]
pub enum PipeWriter {
    Local(DuplexStream),
    Remote(ForwardingWriter),
}

impl PipeWriter {
    pub fn locality(&self) -> Locality {
        Locality::from_is_local(matches!(self, PipeWriter::Local(_)))
    }
}

impl AsyncWrite for PipeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            PipeWriter::Local(stream) => Pin::new(stream).poll_write(cx, buf),
            PipeWriter::Remote(writer) => Pin::new(writer).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            PipeWriter::Local(stream) => Pin::new(stream).poll_flush(cx),
            PipeWriter::Remote(writer) => Pin::new(writer).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            PipeWriter::Local(stream) => Pin::new(stream).poll_shutdown(cx),
            PipeWriter::Remote(writer) => Pin::new(writer).poll_shutdown(cx),
        }
    }
}

/// Writes each buffer as one chunk onto the remote link queue
#[derive(Debug)]
pub struct ForwardingWriter {
    tx: PollSender<Bytes>,
}

impl AsyncWrite for ForwardingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        if ready!(this.tx.poll_reserve(cx)).is_err() {
            return Poll::Ready(Err(link_closed()));
        }
        this.tx
            .send_item(Bytes::copy_from_slice(buf))
            .map_err(|_| link_closed())?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.tx.is_closed() {
            return Poll::Ready(Err(link_closed()));
        }
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().tx.close();
        Poll::Ready(Ok(()))
    }
}
