//! Block definitions: named regions delimited by begin/end line patterns.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Whether a delimiter line belongs to the region it delimits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchType {
    /// The delimiter line is part of the block
    Inclusive,
    /// The delimiter line sits outside the block and is classified on its own
    Exclusive,
}

/// An immutable block rule
#[derive(Debug)]
pub struct BlockDefinition {
    name: String,
    begin: Regex,
    end: Regex,
    begin_match: MatchType,
    end_match: MatchType,
}

impl BlockDefinition {
    /// Build a definition whose begin and end delimiters share `match_type`
    pub fn new(name: impl Into<String>, begin: &str, end: &str, match_type: MatchType) -> Result<Self> {
        let name = name.into();
        let begin = Regex::new(begin).map_err(|e| Error::pattern(format!("{name}.begin"), e))?;
        let end = Regex::new(end).map_err(|e| Error::pattern(format!("{name}.end"), e))?;
        Ok(Self {
            name,
            begin,
            end,
            begin_match: match_type,
            end_match: match_type,
        })
    }

    /// Override the match semantics of the end delimiter
    pub fn with_end_match(mut self, end_match: MatchType) -> Self {
        self.end_match = end_match;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn begin_match(&self) -> MatchType {
        self.begin_match
    }

    pub fn end_match(&self) -> MatchType {
        self.end_match
    }

    /// Text captured by the begin pattern: the first group, or the whole
    /// match when the pattern has no groups.
    pub fn capture_begin(&self, line: &str) -> Option<String> {
        let caps = self.begin.captures(line)?;
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    }

    /// Match semantics of the end delimiter if `line` closes this block
    pub fn matches_end(&self, line: &str) -> Option<MatchType> {
        self.end.is_match(line).then_some(self.end_match)
    }
}

/// A block opened by a concrete line
#[derive(Debug, Clone)]
pub struct MatchedBlock {
    pub definition: Arc<BlockDefinition>,
    pub captured: String,
}

impl MatchedBlock {
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn matches_end(&self, line: &str) -> Option<MatchType> {
        self.definition.matches_end(line)
    }
}

/// Ordered list of block definitions; the first matching begin pattern wins
#[derive(Debug, Clone, Default)]
pub struct BlockRuleTable {
    definitions: Vec<Arc<BlockDefinition>>,
}

impl BlockRuleTable {
    pub fn new(definitions: Vec<BlockDefinition>) -> Self {
        Self {
            definitions: definitions.into_iter().map(Arc::new).collect(),
        }
    }

    /// The Unity Editor.log block table
    pub fn editor() -> &'static BlockRuleTable {
        &EDITOR_BLOCKS
    }

    /// Scan in declaration order for the first definition whose begin
    /// pattern matches `line`.
    pub fn match_begin(&self, line: &str) -> Option<MatchedBlock> {
        self.definitions.iter().find_map(|definition| {
            definition
                .capture_begin(line)
                .map(|captured| MatchedBlock {
                    definition: Arc::clone(definition),
                    captured,
                })
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.definitions.iter().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

static EDITOR_BLOCKS: LazyLock<BlockRuleTable> = LazyLock::new(|| {
    BlockRuleTable::new(vec![
        BlockDefinition::new(
            "PlayerStatistics",
            r"^\*\*\*Player size statistics\*\*\*$",
            r"^\s*$",
            MatchType::Exclusive,
        )
        .expect("PlayerStatistics block patterns are valid"),
        BlockDefinition::new(
            "Compile",
            r"^-----CompilerOutput:-stdout--exitcode: \d+--compilationhadfailure: (?:True|False)--outfile: (.+)$",
            r"^-----EndCompilerOutput-+$",
            MatchType::Inclusive,
        )
        .expect("Compile block patterns are valid"),
        BlockDefinition::new(
            "Prepare",
            r"^Refresh: detecting if any assets need to be imported or removed \.\.\.\s*$",
            r"^Refresh: elapses .+$",
            MatchType::Inclusive,
        )
        .expect("Prepare block patterns are valid"),
        BlockDefinition::new(
            "Lightmap",
            r"^\[Lightmapping\] Baking (.+)$",
            r"^\[Lightmapping\] Bake (?:finished|cancelled|failed)\b.*$",
            MatchType::Inclusive,
        )
        .expect("Lightmap block patterns are valid"),
        BlockDefinition::new(
            "Update",
            r"^Updating (.+) - GUID: .*$",
            r"^\s*done: hash - .+$",
            MatchType::Inclusive,
        )
        .expect("Update block patterns are valid"),
    ])
});
