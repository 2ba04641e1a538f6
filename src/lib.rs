//! logrelay library
//!
//! Command implementations behind the `logrelay` binary.

// Module declarations
pub mod parse;
pub mod report;

// Re-export main entry points
pub use parse::{parse_log, OutputFormat, ParseSummary};
pub use report::{render_run_report, run_exit_code};
