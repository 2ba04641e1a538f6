//! logrelay-app - Relay orchestration for logrelay
//!
//! Wires the tailing layer to a console: configuration loading, log path
//! discovery, console annotation, the external process and the run loop
//! that ties them together.

pub mod annotator;
pub mod config;
pub mod paths;
pub mod process;
pub mod runner;
pub mod session;
pub mod signals;

// Re-export primary types
pub use annotator::{AnnotatingWriter, SeverityTally};
pub use config::{LogSettings, RelaySettings, Settings};
pub use paths::{default_editor_log_path, find_log_file_arg, resolve_log_path};
pub use process::{ExternalProcess, ProcessExit};
pub use runner::{run_external, RunOptions, RunOutcome};
pub use session::{RelaySession, SessionSummary};
pub use signals::spawn_signal_handler;
