//! Polling detection of a file's first creation or modification

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

use logrelay_core::prelude::*;

/// Default time between two checks of the watched path
pub const DEFAULT_DETECT_INTERVAL: Duration = Duration::from_millis(50);

/// Snapshot of a path's state, taken before the external process starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileBaseline {
    pub exists: bool,
    pub modified: Option<SystemTime>,
    pub len: Option<u64>,
}

impl FileBaseline {
    /// Capture the current state of `path`; unreadable metadata counts as missing
    pub fn capture(path: &Path) -> Self {
        match std::fs::metadata(path) {
            Ok(meta) => Self::from_metadata(&meta),
            Err(_) => Self::missing(),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            exists: true,
            modified: meta.modified().ok(),
            len: Some(meta.len()),
        }
    }

    /// Whether `current` counts as a change relative to this baseline.
    ///
    /// A missing file is never a change: the path may be between a rename
    /// and its recreation.
    pub fn is_changed_by(&self, current: &FileBaseline) -> bool {
        if !current.exists {
            return false;
        }
        if !self.exists {
            return true;
        }
        current.len != self.len || current.modified > self.modified
    }
}

/// Waits until a path is created or modified relative to a baseline
#[derive(Debug, Clone)]
pub struct FileChangeDetector {
    path: PathBuf,
    baseline: FileBaseline,
    interval: Duration,
}

impl FileChangeDetector {
    /// Capture the baseline of `path` now
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let baseline = FileBaseline::capture(&path);
        Self::with_baseline(path, baseline)
    }

    pub fn with_baseline(path: impl Into<PathBuf>, baseline: FileBaseline) -> Self {
        Self {
            path: path.into(),
            baseline,
            interval: DEFAULT_DETECT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn baseline(&self) -> &FileBaseline {
        &self.baseline
    }

    /// Check the path once
    pub async fn poll_once(&self) -> bool {
        let current = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => FileBaseline::from_metadata(&meta),
            Err(_) => FileBaseline::missing(),
        };
        self.baseline.is_changed_by(&current)
    }

    /// Poll until the path changes.
    ///
    /// Returns `None` when `cancel` fires first. A path that already counts as
    /// changed resolves on the first poll without waiting.
    pub async fn wait(&self, cancel: &CancellationToken) -> Option<PathBuf> {
        let mut polls = 0u64;
        loop {
            polls += 1;
            if self.poll_once().await {
                debug!(
                    "Change detected on {} after {} poll(s)",
                    self.path.display(),
                    polls
                );
                return Some(self.path.clone());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Change detection on {} cancelled", self.path.display());
                    return None;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
