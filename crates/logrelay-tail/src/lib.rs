//! # logrelay-tail - File Tailing and Stream Relay
//!
//! Follows a log file that another process is writing, and moves its bytes
//! to a consumer through an in-memory pipe.
//!
//! Depends on [`logrelay_core`] for error handling and domain types.
//!
//! ## Public API
//!
//! ### Change Detection
//! - [`FileBaseline`] - Snapshot of a path taken before the producer starts
//! - [`FileChangeDetector`] - Polls until the path is created or modified
//!
//! ### Tailing
//! - [`TailRelay`] - Copies new bytes of a file into a sink until cancelled
//! - [`TailConfig`], [`TruncationPolicy`] - Poll timing and truncation handling
//! - [`RelayReport`], [`RelayEnd`] - What a finished relay did
//!
//! ### Pipes
//! - [`channel::create()`] - Connected [`PipeReader`] / [`PipeWriter`] pair
//!
//! ### Stream Copy
//! - [`CopyRelayTask`] - Background copy from a reader to a writer
//! - [`copy_stream()`] - The copy loop itself

pub mod channel;
pub mod copy;
pub mod detector;
pub mod relay;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use channel::{PipeReader, PipeWriter, DEFAULT_PIPE_CAPACITY};
pub use copy::{copy_stream, CopyRelayTask, CopyTaskResult};
pub use detector::{FileBaseline, FileChangeDetector, DEFAULT_DETECT_INTERVAL};
pub use relay::{
    FileCursor, RelayEnd, RelayReport, TailConfig, TailRelay, TruncationPolicy,
    DEFAULT_POLL_INTERVAL, NOTICE_PREFIX,
};

// Re-exported so callers can cancel relays without naming tokio-util.
pub use tokio_util::sync::CancellationToken;
