//! Per-line severity rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::types::LineSeverity;

/// A single `pattern -> severity` rule
#[derive(Debug, Clone)]
pub struct LineRule {
    pattern: Regex,
    severity: LineSeverity,
}

impl LineRule {
    pub fn new(pattern: &str, severity: LineSeverity) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::pattern(format!("line rule '{pattern}'"), e))?;
        Ok(Self { pattern, severity })
    }

    pub fn severity(&self) -> LineSeverity {
        self.severity
    }

    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// Ordered severity rules, first match wins, default `Normal`
#[derive(Debug, Clone, Default)]
pub struct LineSeverityTable {
    rules: Vec<LineRule>,
}

impl LineSeverityTable {
    pub fn new(rules: Vec<LineRule>) -> Self {
        Self { rules }
    }

    /// The Unity Editor.log severity table
    pub fn editor() -> &'static LineSeverityTable {
        &EDITOR_LINES
    }

    pub fn classify(&self, line: &str) -> LineSeverity {
        self.rules
            .iter()
            .find(|rule| rule.matches(line))
            .map(LineRule::severity)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

static EDITOR_LINES: LazyLock<LineSeverityTable> = LazyLock::new(|| {
    let rule = |pattern: &str, severity| {
        LineRule::new(pattern, severity).expect("Editor line rule pattern is valid")
    };
    LineSeverityTable::new(vec![
        // Failures end the batch run
        rule(r"\w*Exception: ", LineSeverity::Failure),
        rule(r"^Aborting batchmode due to failure", LineSeverity::Failure),
        rule(r"^Scripts have compiler errors", LineSeverity::Failure),
        rule(
            r"^executeMethod class '.+' could not be found",
            LineSeverity::Failure,
        ),
        rule(r"\(\d+,\d+\): error [A-Z]+\d+: ", LineSeverity::Error),
        rule(r"^(?:Error|ERROR)\b", LineSeverity::Error),
        rule(r"\(\d+,\d+\): warning [A-Z]+\d+: ", LineSeverity::Warning),
        rule(r"^(?:Warning|WARNING)\b", LineSeverity::Warning),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> LineSeverity {
        LineSeverityTable::editor().classify(line)
    }

    #[test]
    fn test_plain_line_is_normal() {
        assert_eq!(classify("Initialize engine version: 2021.3.16f1"), LineSeverity::Normal);
        assert_eq!(classify(""), LineSeverity::Normal);
    }

    #[test]
    fn test_compiler_diagnostics() {
        assert_eq!(
            classify("Assets/Scripts/Player.cs(12,5): error CS0103: The name 'speed' does not exist"),
            LineSeverity::Error
        );
        assert_eq!(
            classify("Assets/Scripts/Enemy.cs(40,13): warning CS0168: The variable 'e' is declared but never used"),
            LineSeverity::Warning
        );
    }

    #[test]
    fn test_exceptions_are_failures() {
        assert_eq!(
            classify("NullReferenceException: Object reference not set to an instance of an object"),
            LineSeverity::Failure
        );
        assert_eq!(
            classify("System.IO.IOException: Sharing violation on path Temp/x"),
            LineSeverity::Failure
        );
        assert_eq!(classify("Aborting batchmode due to failure:"), LineSeverity::Failure);
    }

    #[test]
    fn test_prefix_rules() {
        assert_eq!(classify("WARNING: Shader Unsupported: 'Hidden/Foo'"), LineSeverity::Warning);
        assert_eq!(classify("Error building Player: 2 errors"), LineSeverity::Error);
        assert_eq!(classify("Errors are fine mid-word"), LineSeverity::Normal);
    }

    #[test]
    fn test_first_rule_wins_over_later_subset() {
        // Matches both the exception rule and the `Error` prefix rule.
        assert_eq!(
            classify("Error: InvalidOperationException: Collection was modified"),
            LineSeverity::Failure
        );
    }

    #[test]
    fn test_custom_table_order_is_authoritative() {
        let table = LineSeverityTable::new(vec![
            LineRule::new("disk", LineSeverity::Warning).unwrap(),
            LineRule::new("disk full", LineSeverity::Failure).unwrap(),
        ]);
        assert_eq!(table.classify("disk full"), LineSeverity::Warning);
        assert_eq!(LineSeverityTable::default().classify("disk full"), LineSeverity::Normal);
    }
}
