//! Tail a growing file into a sink until cancelled
//!
//! [`TailRelay`] waits for the file to be created or modified, then loops:
//! reopen the path, seek to the cursor, copy everything readable to the
//! sink, sleep one poll interval. Cancellation is the normal way it ends;
//! unexpected I/O failures are written into the sink itself so they show up
//! in the console the operator is already watching.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::copy::write_counted;
use crate::detector::{FileBaseline, FileChangeDetector, DEFAULT_DETECT_INTERVAL};
use logrelay_core::prelude::*;

/// Default delay between two copy passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Read buffer size for one copy pass
const COPY_BUFFER_SIZE: usize = 8192;

/// Prefix of every diagnostic line the relay writes into the sink
pub const NOTICE_PREFIX: &str = "[logrelay]";

/// What to do when the file is shorter than the read cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Treat the file as replaced: restart at offset 0 and mark the discontinuity
    #[default]
    Restart,
    /// Keep the cursor and wait until the file grows past it again
    Hold,
}

#[derive(Debug, Clone)]
pub struct TailConfig {
    pub poll_interval: Duration,
    pub detect_interval: Duration,
    pub close_sink_on_finish: bool,
    pub truncation: TruncationPolicy,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            detect_interval: DEFAULT_DETECT_INTERVAL,
            close_sink_on_finish: false,
            truncation: TruncationPolicy::default(),
        }
    }
}

impl TailConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_detect_interval(mut self, interval: Duration) -> Self {
        self.detect_interval = interval;
        self
    }

    pub fn with_close_sink(mut self, close: bool) -> Self {
        self.close_sink_on_finish = close;
        self
    }

    pub fn with_truncation(mut self, policy: TruncationPolicy) -> Self {
        self.truncation = policy;
        self
    }
}

/// Read position in the tailed file for one relay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCursor {
    pub path: PathBuf,
    pub baseline: FileBaseline,
    pub read_offset: u64,
}

/// How a relay run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEnd {
    /// Cancelled after the file was detected; the normal path
    Cancelled,
    /// Cancelled before the file was ever created or modified
    NeverDetected,
    /// Copying failed; the message was also written into the sink
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    /// Bytes of file content written to the sink
    pub bytes_copied: u64,
    /// Cursor position when the relay stopped
    pub read_offset: u64,
    /// Times the cursor was restarted after the file shrank or was replaced
    pub restarts: u32,
    pub end: RelayEnd,
}

/// Tails one file into one sink
#[derive(Debug)]
pub struct TailRelay {
    cursor: FileCursor,
    config: TailConfig,
    bytes_copied: u64,
    restarts: u32,
    /// Identity of the file read on the last pass
    identity: Option<FileIdentity>,
    /// The path was missing on some pass since the last read
    saw_missing: bool,
}

impl TailRelay {
    /// Create a relay for `path`, capturing its baseline immediately.
    ///
    /// Build the relay before the external process starts so its first
    /// write counts as a change.
    pub fn new(path: impl Into<PathBuf>, config: TailConfig) -> Self {
        let path = path.into();
        let baseline = FileBaseline::capture(&path);
        trace!("Baseline for {}: {:?}", path.display(), baseline);
        Self {
            cursor: FileCursor {
                path,
                baseline,
                read_offset: 0,
            },
            config,
            bytes_copied: 0,
            restarts: 0,
            identity: None,
            saw_missing: false,
        }
    }

    pub fn cursor(&self) -> &FileCursor {
        &self.cursor
    }

    pub fn path(&self) -> &Path {
        &self.cursor.path
    }

    /// Run the relay on its own task
    pub fn spawn<W>(self, sink: W, cancel: CancellationToken) -> JoinHandle<RelayReport>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut sink = sink;
            self.run(&mut sink, &cancel).await
        })
    }

    /// Tail the file into `sink` until `cancel` fires or copying fails
    pub async fn run<W>(mut self, sink: &mut W, cancel: &CancellationToken) -> RelayReport
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let detector =
            FileChangeDetector::with_baseline(self.cursor.path.clone(), self.cursor.baseline)
                .with_interval(self.config.detect_interval);

        let end = match detector.wait(cancel).await {
            None => {
                info!(
                    "No change detected on {} before cancellation",
                    self.cursor.path.display()
                );
                let notice = format!(
                    "{NOTICE_PREFIX} No log output found at {}. If log discovery failed, pass an explicit log file path.\n",
                    self.cursor.path.display()
                );
                if let Err(e) = sink.write_all(notice.as_bytes()).await {
                    warn!("Could not write missing-log notice: {}", e);
                }
                RelayEnd::NeverDetected
            }
            Some(path) => {
                info!("Tailing {}", path.display());
                self.copy_loop(sink, cancel).await
            }
        };

        self.teardown(sink).await;

        info!(
            "Relay of {} finished: {} bytes copied ({:?})",
            self.cursor.path.display(),
            self.bytes_copied,
            end
        );
        RelayReport {
            bytes_copied: self.bytes_copied,
            read_offset: self.cursor.read_offset,
            restarts: self.restarts,
            end,
        }
    }

    async fn copy_loop<W>(&mut self, sink: &mut W, cancel: &CancellationToken) -> RelayEnd
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        loop {
            if let Err(e) = self.copy_pass(sink, Some(cancel)).await {
                return self.report_failure(sink, e).await;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        // Pick up whatever was appended between the last pass and cancellation.
        if let Err(e) = self.copy_pass(sink, None).await {
            return self.report_failure(sink, e).await;
        }
        RelayEnd::Cancelled
    }

    /// One open/seek/read cycle over the current file at the path.
    ///
    /// Reads up to the length seen when the file was opened. With `cancel`
    /// set, the pass also stops between buffers once it fires.
    async fn copy_pass<W>(
        &mut self,
        sink: &mut W,
        cancel: Option<&CancellationToken>,
    ) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut file = match File::open(&self.cursor.path).await {
            Ok(file) => file,
            Err(e) if is_transient(&e) => {
                trace!("{} not readable this pass: {}", self.cursor.path.display(), e);
                if e.kind() == io::ErrorKind::NotFound {
                    self.saw_missing = true;
                }
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let metadata = file.metadata().await?;
        let len = metadata.len();
        let identity = file_identity(&metadata);
        let replaced = self.cursor.read_offset > 0
            && (self.saw_missing || (self.identity.is_some() && identity != self.identity));
        let shrunk = len < self.cursor.read_offset;
        self.identity = identity;
        self.saw_missing = false;

        if replaced || shrunk {
            match self.config.truncation {
                TruncationPolicy::Restart => {
                    warn!(
                        "{} {} (cursor {}, length {}), restarting at offset 0",
                        self.cursor.path.display(),
                        if replaced { "was replaced" } else { "shrank" },
                        self.cursor.read_offset,
                        len
                    );
                    let notice = format!(
                        "\n{NOTICE_PREFIX} {} was truncated or replaced; continuing from its start.\n",
                        self.cursor.path.display()
                    );
                    sink.write_all(notice.as_bytes()).await?;
                    self.cursor.read_offset = 0;
                    self.restarts += 1;
                }
                TruncationPolicy::Hold if shrunk => {
                    trace!(
                        "{} is {} bytes, behind cursor {}",
                        self.cursor.path.display(),
                        len,
                        self.cursor.read_offset
                    );
                    return Ok(());
                }
                TruncationPolicy::Hold => {}
            }
        }

        file.seek(SeekFrom::Start(self.cursor.read_offset)).await?;

        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut pass_bytes = 0u64;
        while self.cursor.read_offset < len {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                trace!("Cancelled mid-pass at offset {}", self.cursor.read_offset);
                break;
            }
            let want = (buf.len() as u64).min(len - self.cursor.read_offset) as usize;
            let n = file.read(&mut buf[..want]).await?;
            if n == 0 {
                break;
            }

            let before = self.bytes_copied;
            let result = write_counted(sink, &buf[..n], &mut self.bytes_copied).await;
            let written = self.bytes_copied - before;
            self.cursor.read_offset += written;
            pass_bytes += written;
            result?;
        }

        if pass_bytes > 0 {
            sink.flush().await?;
            trace!(
                "Copied {} bytes from {}, cursor at {}",
                pass_bytes,
                self.cursor.path.display(),
                self.cursor.read_offset
            );
        }
        Ok(())
    }

    async fn report_failure<W>(&mut self, sink: &mut W, e: io::Error) -> RelayEnd
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        error!("Relay of {} failed: {}", self.cursor.path.display(), e);
        let message = format!("{}: {}", self.cursor.path.display(), e);
        let line = format!("\n{NOTICE_PREFIX} Log relay failed: {message}\n");
        if let Err(write_err) = sink.write_all(line.as_bytes()).await {
            warn!("Could not report relay failure into the sink: {}", write_err);
        }
        RelayEnd::Failed { message }
    }

    async fn teardown<W>(&mut self, sink: &mut W)
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let result = if self.config.close_sink_on_finish {
            sink.shutdown().await
        } else {
            sink.flush().await
        };
        if let Err(e) = result {
            debug!("Sink teardown error (ignored): {}", e);
        }
    }
}

/// Device and inode of an open file
type FileIdentity = (u64, u64);

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_identity(_metadata: &std::fs::Metadata) -> Option<FileIdentity> {
    None
}

/// Missing or locked files are retried on the next pass
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}
