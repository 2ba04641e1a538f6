//! # logrelay-core - Core Domain Types
//!
//! Foundation crate for logrelay. Provides domain types, error handling,
//! logging setup, the declarative block/line rule tables and the log
//! segmentation state machine.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`LineSeverity`] - Severity tier of a classified line (Normal, Warning, Error, Failure)
//! - [`Locality`] - Whether the tailing producer runs beside the consumer or remotely
//!
//! ### Events (`events`)
//! - [`SegmentEvent`] - BlockStart / BlockEnd / Line events emitted by the segmenter
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Rule Tables (`rules`)
//! - [`BlockRuleTable`], [`BlockDefinition`], [`MatchType`] - Ordered block delimiters
//! - [`LineSeverityTable`], [`LineRule`] - Ordered `pattern -> severity` rules
//! - [`RuleSet`] - The pair of tables a segmenter runs against
//!
//! ### Segmentation (`segmenter`)
//! - [`step()`] - Pure stack transition for one line
//! - [`LogSegmenter`] - Stateful dispatcher feeding a [`SegmentListener`]
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use logrelay_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod prelude;
pub mod rules;
pub mod segmenter;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::SegmentEvent;
pub use rules::{
    BlockDefinition, BlockRuleTable, LineRule, LineSeverityTable, MatchType, MatchedBlock, RuleSet,
};
pub use segmenter::{format_exception, step, BlockStack, LogSegmenter, SegmentListener};
pub use types::{LineSeverity, Locality};
