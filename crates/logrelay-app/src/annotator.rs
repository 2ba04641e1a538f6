//! Console annotation: segment relayed bytes while passing them through
//!
//! [`AnnotatingWriter`] sits in front of the console sink. Bytes reach the
//! inner writer unchanged; complete lines are also fed to a [`LogSegmenter`]
//! so a [`SeverityTally`] (or any other listener) sees the log's structure.

use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

use logrelay_core::prelude::*;
use logrelay_core::{LineSeverity, LogSegmenter, MatchedBlock, SegmentEvent, SegmentListener};

/// `AsyncWrite` adapter that segments everything written through it
#[derive(Debug)]
pub struct AnnotatingWriter<W, L> {
    inner: W,
    segmenter: LogSegmenter<L>,
    pending: Vec<u8>,
}

impl<W, L: SegmentListener> AnnotatingWriter<W, L> {
    /// Annotate with the Editor.log rules
    pub fn new(inner: W, listener: L) -> Self {
        Self::with_segmenter(inner, LogSegmenter::new(listener))
    }

    pub fn with_segmenter(inner: W, segmenter: LogSegmenter<L>) -> Self {
        Self {
            inner,
            segmenter,
            pending: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn segmenter(&self) -> &LogSegmenter<L> {
        &self.segmenter
    }

    /// Bytes of a line that has not seen its terminator yet
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn feed(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            self.emit_pending();
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
    }

    fn emit_pending(&mut self) {
        let mut line: &[u8] = &self.pending;
        while let Some((&b'\r', head)) = line.split_last() {
            line = head;
        }
        let text = String::from_utf8_lossy(line);
        self.segmenter.log(&text);
        self.pending.clear();
    }

    /// Segment a trailing line that never got its terminator
    pub fn flush_partial_line(&mut self) {
        if !self.pending.is_empty() {
            self.emit_pending();
        }
    }

    /// Split into the inner writer and the segmenter, flushing any partial line
    pub fn into_parts(mut self) -> (W, LogSegmenter<L>) {
        self.flush_partial_line();
        (self.inner, self.segmenter)
    }

    /// Split into the inner writer, the listener and the blocks left open
    pub fn finish(self) -> (W, L, Vec<MatchedBlock>) {
        let (inner, segmenter) = self.into_parts();
        let (listener, open) = segmenter.finish();
        (inner, listener, open)
    }
}

impl<W, L> AsyncWrite for AnnotatingWriter<W, L>
where
    W: AsyncWrite + Unpin,
    L: SegmentListener + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.feed(&buf[..n]);
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.flush_partial_line();
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

/// Counts lines per severity and completed blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeverityTally {
    lines: BTreeMap<LineSeverity, usize>,
    blocks_completed: usize,
    first_failure: Option<String>,
}

impl SeverityTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, severity: LineSeverity) -> usize {
        self.lines.get(&severity).copied().unwrap_or(0)
    }

    pub fn total_lines(&self) -> usize {
        self.lines.values().sum()
    }

    pub fn blocks_completed(&self) -> usize {
        self.blocks_completed
    }

    /// Text of the first `Failure` line, if any
    pub fn first_failure(&self) -> Option<&str> {
        self.first_failure.as_deref()
    }

    pub fn has_problems(&self) -> bool {
        self.lines
            .iter()
            .any(|(severity, count)| severity.is_problem() && *count > 0)
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "{} lines, {} blocks: {} failures, {} errors, {} warnings",
            self.total_lines(),
            self.blocks_completed,
            self.count(LineSeverity::Failure),
            self.count(LineSeverity::Error),
            self.count(LineSeverity::Warning),
        )
    }
}

impl SegmentListener for SeverityTally {
    fn on_event(&mut self, event: &SegmentEvent) {
        match event {
            SegmentEvent::BlockStart { name, captured } => {
                debug!("Block {} started: {}", name, captured);
            }
            SegmentEvent::BlockEnd { name } => {
                self.blocks_completed += 1;
                debug!("Block {} ended", name);
            }
            SegmentEvent::Line { text, severity } => {
                *self.lines.entry(*severity).or_insert(0) += 1;
                if *severity == LineSeverity::Failure && self.first_failure.is_none() {
                    self.first_failure = Some(text.clone());
                }
            }
        }
    }
}
