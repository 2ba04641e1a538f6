//! Core domain types shared by the tailing and segmentation layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity tier of a single classified log line
///
/// Ordered from least to most severe so tallies and filters can compare.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LineSeverity {
    #[default]
    Normal,
    Warning,
    Error,
    Failure,
}

impl LineSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineSeverity::Normal => "normal",
            LineSeverity::Warning => "warning",
            LineSeverity::Error => "error",
            LineSeverity::Failure => "failure",
        }
    }

    /// Anything above `Normal`
    pub fn is_problem(&self) -> bool {
        *self > LineSeverity::Normal
    }
}

impl fmt::Display for LineSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the tailing producer runs relative to the console consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    /// Producer and consumer share an execution context
    #[default]
    Local,
    /// Producer runs behind a forwarding boundary
    Remote,
}

impl Locality {
    pub fn from_is_local(is_local: bool) -> Self {
        if is_local {
            Locality::Local
        } else {
            Locality::Remote
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Locality::Local)
    }
}
