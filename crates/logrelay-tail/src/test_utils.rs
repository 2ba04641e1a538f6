//! Test helpers for tailing and relay tests
//!
//! Available in this crate's tests and, through the `test-helpers` feature,
//! to downstream crates.

use std::io::{self, Write};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

/// Append `bytes` to `path`, creating the file if needed
pub fn append(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

/// Sink that accepts `capacity` bytes, then fails every write
#[derive(Debug)]
pub struct FailingWriter {
    pub written: Vec<u8>,
    capacity: usize,
    kind: io::ErrorKind,
}

impl FailingWriter {
    pub fn new(capacity: usize) -> Self {
        Self::with_kind(capacity, io::ErrorKind::BrokenPipe)
    }

    pub fn with_kind(capacity: usize, kind: io::ErrorKind) -> Self {
        Self {
            written: Vec::new(),
            capacity,
            kind,
        }
    }
}

impl AsyncWrite for FailingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let room = this.capacity.saturating_sub(this.written.len());
        if room == 0 {
            return Poll::Ready(Err(io::Error::new(this.kind, "sink refused write")));
        }
        let n = room.min(buf.len());
        this.written.extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
