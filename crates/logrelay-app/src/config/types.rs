//! Configuration types for logrelay
//!
//! Defines:
//! - `Settings` - Contents of `.logrelay/config.toml`
//! - `RelaySettings` - Tailing and pipe tuning
//! - `LogSettings` - Which log to follow and how to present it

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use logrelay_core::Locality;
use logrelay_tail::{TailConfig, TruncationPolicy, DEFAULT_PIPE_CAPACITY};

/// Application settings (.logrelay/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub log: LogSettings,
}

/// Relay timing and buffering
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelaySettings {
    /// Delay between two copy passes once the log is found
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between two checks while waiting for the log to appear
    #[serde(default = "default_detect_interval_ms")]
    pub detect_interval_ms: u64,

    /// How long to keep tailing after the external process exits
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Bytes buffered between producer and consumer
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,

    #[serde(default)]
    pub truncation: TruncationPolicy,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            detect_interval_ms: default_detect_interval_ms(),
            grace_period_ms: default_grace_period_ms(),
            pipe_capacity: default_pipe_capacity(),
            truncation: TruncationPolicy::default(),
        }
    }
}

impl RelaySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn detect_interval(&self) -> Duration {
        Duration::from_millis(self.detect_interval_ms.max(1))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Tail configuration for a relay that owns its sink
    pub fn tail_config(&self) -> TailConfig {
        TailConfig::default()
            .with_poll_interval(self.poll_interval())
            .with_detect_interval(self.detect_interval())
            .with_truncation(self.truncation)
            .with_close_sink(true)
    }
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_detect_interval_ms() -> u64 {
    50
}

fn default_grace_period_ms() -> u64 {
    1000
}

fn default_pipe_capacity() -> usize {
    DEFAULT_PIPE_CAPACITY
}

/// Log source and presentation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogSettings {
    /// Log file to follow; platform default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Classify relayed lines and print a severity summary
    #[serde(default = "default_true")]
    pub annotate: bool,

    /// Where the tailing producer runs relative to the console
    #[serde(default)]
    pub locality: Locality,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            path: None,
            annotate: true,
            locality: Locality::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
