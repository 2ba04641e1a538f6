//! Block/line segmentation of free-form log output.
//!
//! Provides a stack-based state machine that recognizes nested block
//! regions (compilation, asset updates, lightmap bakes, ...) and per-line
//! severity. The transition itself is [`step`], a deterministic function of
//! the block stack, one line and a [`RuleSet`]; [`LogSegmenter`] owns the
//! stack and forwards the produced events to a [`SegmentListener`].

use std::sync::Arc;

use crate::events::SegmentEvent;
use crate::rules::{MatchType, MatchedBlock, RuleSet};
use crate::types::LineSeverity;

// ─────────────────────────────────────────────────────────────────────────────
// Block Stack
// ─────────────────────────────────────────────────────────────────────────────

/// LIFO of currently open blocks; depth 0 means outside all blocks
#[derive(Debug, Clone, Default)]
pub struct BlockStack {
    blocks: Vec<MatchedBlock>,
}

impl BlockStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Innermost open block
    pub fn top(&self) -> Option<&MatchedBlock> {
        self.blocks.last()
    }

    /// Open block names, outermost first
    pub fn names(&self) -> Vec<&str> {
        self.blocks.iter().map(MatchedBlock::name).collect()
    }

    fn push(&mut self, block: MatchedBlock) {
        self.blocks.push(block);
    }

    fn pop(&mut self) -> Option<MatchedBlock> {
        self.blocks.pop()
    }

    fn into_blocks(self) -> Vec<MatchedBlock> {
        self.blocks
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transition
// ─────────────────────────────────────────────────────────────────────────────

/// Advance the state machine by one line.
///
/// Returns the events produced by `line`, in emission order. The stack is
/// the only state touched.
pub fn step(stack: &mut BlockStack, line: &str, rules: &RuleSet) -> Vec<SegmentEvent> {
    let mut events = Vec::with_capacity(2);

    // 1. Does the line close the innermost block?
    if let Some(top) = stack.top() {
        match top.matches_end(line) {
            Some(MatchType::Inclusive) => {
                events.push(classify(line, rules));
                close_top(stack, &mut events);
                return events;
            }
            Some(MatchType::Exclusive) => {
                // The marker is outside the block; keep evaluating it.
                close_top(stack, &mut events);
            }
            None => {}
        }
    }

    // 2. Does it open a new one?
    if let Some(matched) = rules.blocks.match_begin(line) {
        if matched.definition.begin_match() == MatchType::Exclusive {
            events.push(classify(line, rules));
        }
        events.push(SegmentEvent::block_start(matched.name(), matched.captured.clone()));
        stack.push(matched);
        return events;
    }

    // 3. Ordinary line
    events.push(classify(line, rules));
    events
}

fn classify(line: &str, rules: &RuleSet) -> SegmentEvent {
    SegmentEvent::line(line, rules.lines.classify(line))
}

fn close_top(stack: &mut BlockStack, events: &mut Vec<SegmentEvent>) {
    if let Some(block) = stack.pop() {
        events.push(SegmentEvent::block_end(block.name()));
    }
}

/// Render an error and its source chain as an `Exception:` trace
pub fn format_exception(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = format!("Exception: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    text
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Receives segmentation events synchronously, in line-arrival order
pub trait SegmentListener {
    fn on_event(&mut self, event: &SegmentEvent);
}

impl<F> SegmentListener for F
where
    F: FnMut(&SegmentEvent),
{
    fn on_event(&mut self, event: &SegmentEvent) {
        self(event)
    }
}

impl SegmentListener for Vec<SegmentEvent> {
    fn on_event(&mut self, event: &SegmentEvent) {
        self.push(event.clone());
    }
}

/// Stateful segmenter: owns the block stack for one run
#[derive(Debug)]
pub struct LogSegmenter<L> {
    rules: Arc<RuleSet>,
    stack: BlockStack,
    listener: L,
    lines_seen: usize,
}

impl<L: SegmentListener> LogSegmenter<L> {
    /// Segmenter over the Editor.log rules
    pub fn new(listener: L) -> Self {
        Self::with_rules(RuleSet::editor(), listener)
    }

    pub fn with_rules(rules: Arc<RuleSet>, listener: L) -> Self {
        Self {
            rules,
            stack: BlockStack::new(),
            listener,
            lines_seen: 0,
        }
    }

    /// Feed one line (without its line terminator)
    pub fn log(&mut self, line: &str) {
        self.lines_seen += 1;
        for event in step(&mut self.stack, line, &self.rules) {
            self.listener.on_event(&event);
        }
    }

    /// Report an out-of-band fault as a `Failure` line.
    ///
    /// Bypasses the rule tables and leaves the block stack untouched.
    pub fn log_exception(&mut self, error: &(dyn std::error::Error + 'static)) {
        let event = SegmentEvent::line(format_exception(error), LineSeverity::Failure);
        self.listener.on_event(&event);
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn stack(&self) -> &BlockStack {
        &self.stack
    }

    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// End the run, returning the listener and any blocks never closed
    pub fn finish(self) -> (L, Vec<MatchedBlock>) {
        (self.listener, self.stack.into_blocks())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
