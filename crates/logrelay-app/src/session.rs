//! Relay session: producer, pipe and consumer wired together
//!
//! ```text
//! log file --TailRelay--> PipeWriter ==pipe==> PipeReader --CopyRelayTask--> console
//! ```
//!
//! The relay is created (and the file baseline captured) in [`RelaySession::start`],
//! which must run before the external process is launched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use logrelay_core::prelude::*;
use logrelay_core::Locality;
use logrelay_tail::{channel, CopyRelayTask, CopyTaskResult, RelayReport, TailRelay};

use crate::config::RelaySettings;

/// What a finished session did
#[derive(Debug)]
pub struct SessionSummary<W> {
    pub relay: RelayReport,
    pub copy: CopyTaskResult,
    /// The console sink, handed back after the copy drained the pipe
    pub console: Option<W>,
}

/// A running tail-and-relay session
#[derive(Debug)]
pub struct RelaySession<W> {
    path: PathBuf,
    locality: Locality,
    grace_period: Duration,
    cancel: CancellationToken,
    relay: JoinHandle<RelayReport>,
    copy: CopyRelayTask<W>,
}

impl<W> RelaySession<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Start tailing `path` into `console`
    pub fn start(
        path: impl Into<PathBuf>,
        console: W,
        locality: Locality,
        settings: &RelaySettings,
    ) -> Self {
        let path = path.into();
        let (reader, writer) = channel::create(locality, settings.pipe_capacity);

        let relay = TailRelay::new(&path, settings.tail_config());
        let cancel = CancellationToken::new();
        let relay = relay.spawn(writer, cancel.clone());
        let copy = CopyRelayTask::spawn("console", reader, console, false);

        info!(
            "Relay session started for {} ({:?} pipe, {} byte buffer)",
            path.display(),
            locality,
            settings.pipe_capacity
        );

        Self {
            path,
            locality,
            grace_period: settings.grace_period(),
            cancel,
            relay,
            copy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn locality(&self) -> Locality {
        self.locality
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Token that stops the producer when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Keep tailing for the grace period, then stop and drain
    pub async fn finish(self) -> Result<SessionSummary<W>> {
        let grace = self.grace_period;
        self.finish_after(grace).await
    }

    /// Keep tailing for `grace`, then stop and drain
    pub async fn finish_after(self, grace: Duration) -> Result<SessionSummary<W>> {
        if !grace.is_zero() {
            debug!("Waiting {:?} for trailing log output", grace);
            tokio::time::sleep(grace).await;
        }
        self.cancel.cancel();

        // A relay that died still dropped its pipe writer, so the copy task
        // reaches end of stream and is joined before either error surfaces.
        let relay = self.relay.await;
        let copy = self.copy.join().await.context("console copy task");
        let relay = relay.map_err(|e| Error::task_aborted(format!("tail relay: {}", e)))?;
        let (copy, console) = copy?;

        match &copy.failure {
            Some(failure) if failure.is_recoverable() => {
                warn!("Console copy stopped early: {}", failure)
            }
            Some(failure) => error!("Console copy failed: {}", failure),
            None => {}
        }
        info!(
            "Relay session for {} finished: {} bytes tailed, {} bytes shown",
            self.path.display(),
            relay.bytes_copied,
            copy.bytes_copied
        );

        Ok(SessionSummary {
            relay,
            copy,
            console,
        })
    }
}
