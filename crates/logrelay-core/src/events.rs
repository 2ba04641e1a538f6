//! Structured events emitted by the log segmenter

use serde::Serialize;

use crate::types::LineSeverity;

/// One observable step of segmentation, in line-arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SegmentEvent {
    /// A block opened; `captured` is the text its begin pattern captured
    BlockStart { name: String, captured: String },

    /// The innermost open block closed
    BlockEnd { name: String },

    /// A line classified against the severity table
    Line { text: String, severity: LineSeverity },
}

impl SegmentEvent {
    pub fn line(text: impl Into<String>, severity: LineSeverity) -> Self {
        Self::Line {
            text: text.into(),
            severity,
        }
    }

    pub fn block_start(name: impl Into<String>, captured: impl Into<String>) -> Self {
        Self::BlockStart {
            name: name.into(),
            captured: captured.into(),
        }
    }

    pub fn block_end(name: impl Into<String>) -> Self {
        Self::BlockEnd { name: name.into() }
    }

    /// Severity of a line event, `None` for block transitions
    pub fn severity(&self) -> Option<LineSeverity> {
        match self {
            SegmentEvent::Line { severity, .. } => Some(*severity),
            _ => None,
        }
    }
}
