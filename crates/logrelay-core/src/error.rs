//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Rule Table Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid pattern for rule '{rule}': {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Relay/Transport Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Relay task aborted: {reason}")]
    TaskAborted { reason: String },

    // ─────────────────────────────────────────────────────────────
    // External Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to spawn external process '{program}': {reason}")]
    ProcessSpawn { program: String, reason: String },

    #[error("External process not found: {program}")]
    ProgramNotFound { program: String },

    #[error("External process error: {message}")]
    Process { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("No log file path given and no platform default is available")]
    LogPathUnavailable,

    #[error("Signal handling error: {message}")]
    Signal { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn pattern(rule: impl Into<String>, source: regex::Error) -> Self {
        Self::Pattern {
            rule: rule.into(),
            source,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn task_aborted(reason: impl Into<String>) -> Self {
        Self::TaskAborted {
            reason: reason.into(),
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn signal(message: impl Into<String>) -> Self {
        Self::Signal {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors end one relay but leave the external process and
    /// its exit-code handling untouched.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Transport { .. }
                | Error::TaskAborted { .. }
                | Error::Config { .. }
        )
    }

    /// Check if this error should stop the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProcessSpawn { .. }
                | Error::ProgramNotFound { .. }
                | Error::Pattern { .. }
                | Error::LogPathUnavailable
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Log the error with `context`, then pass it on unchanged
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }
}
