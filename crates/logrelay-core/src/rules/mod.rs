//! Declarative rule tables driving log segmentation.
//!
//! Both tables are plain ordered data. Declaration order is authoritative:
//! later rules may be strict subsets of earlier ones and must never win.

pub mod block;
pub mod line;

use std::sync::{Arc, LazyLock};

pub use block::{BlockDefinition, BlockRuleTable, MatchType, MatchedBlock};
pub use line::{LineRule, LineSeverityTable};

/// The block and line tables a segmenter runs against
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub blocks: BlockRuleTable,
    pub lines: LineSeverityTable,
}

static EDITOR_RULES: LazyLock<Arc<RuleSet>> = LazyLock::new(|| {
    Arc::new(RuleSet {
        blocks: BlockRuleTable::editor().clone(),
        lines: LineSeverityTable::editor().clone(),
    })
});

impl RuleSet {
    pub fn new(blocks: BlockRuleTable, lines: LineSeverityTable) -> Self {
        Self { blocks, lines }
    }

    /// Shared Editor.log rules, built once per process
    pub fn editor() -> Arc<RuleSet> {
        Arc::clone(&EDITOR_RULES)
    }
}
