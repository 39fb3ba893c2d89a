//! Streaming markdown processor.
//!
//! Consumes model output chunk by chunk and grows a [`NodeTree`] in place.
//! Nothing is ever re-parsed: each character either extends the active node,
//! waits on the trigger stack, or resolves the stack into a node operation.
//!
//! ```text
//! chunk ─▶ process_char ─┬─ inside fence ──▶ write through / close fence
//!                        ├─ trigger ────────▶ trigger stack
//!                        └─ other ──────────▶ resolve stack ─▶ newline / text
//! ```

use crate::classify::{self, Run, RunClass};
use crate::tree::{Child, NodeId, NodeKind, NodeTree};
use tracing::{debug, trace};

/// Title given to a fenced block that has no language line.
pub const DEFAULT_CODE_TITLE: &str = "Source";

/// Filler of an empty paragraph separator.
const PARAGRAPH_FILL: &str = "\u{a0}";

/// Where a chunk's output goes.
///
/// A deferred anchor is resolved once per chunk, which lets a host hand over
/// "whatever the current turn's container is" without looking it up itself.
pub enum Anchor<'a> {
    Node(NodeId),
    Deferred(Box<dyn FnOnce() -> Option<NodeId> + 'a>),
}

impl<'a> Anchor<'a> {
    pub fn deferred(f: impl FnOnce() -> Option<NodeId> + 'a) -> Self {
        Self::Deferred(Box::new(f))
    }

    fn resolve(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Deferred(f) => f(),
        }
    }
}

impl From<NodeId> for Anchor<'_> {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl std::fmt::Debug for Anchor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(id) => f.debug_tuple("Node").field(id).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Why a node is on the open stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    /// The stream's base node; never closed
    Anchor,
    Bold,
    /// `opened_at` is the raw offset of the opening delimiter
    InlineCode { delimiter: char, opened_at: usize },
    CodeBlock,
    CodeBlockTitle,
    Heading(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenNode {
    pub id: NodeId,
    pub kind: OpenKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FenceState {
    /// The first character after the opening fence decides the title
    awaiting_title: bool,
    /// Last three characters written inside the block
    tail: String,
}

/// All parse state of one stream.
#[derive(Debug, Clone, Default)]
pub struct ParserState {
    anchor: Option<NodeId>,
    /// Open nodes; the top is the active node
    open: Vec<OpenNode>,
    /// Pending trigger characters with their raw offsets
    triggers: Vec<(char, usize)>,
    triggers_at_line_start: bool,
    at_line_start: bool,
    fence: Option<FenceState>,
    newline_run: usize,
    previous: Option<NodeId>,
    raw: String,
}

impl ParserState {
    fn begin(anchor: NodeId) -> Self {
        Self {
            anchor: Some(anchor),
            open: vec![OpenNode {
                id: anchor,
                kind: OpenKind::Anchor,
            }],
            at_line_start: true,
            ..Self::default()
        }
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    pub fn active(&self) -> Option<NodeId> {
        self.open.last().map(|n| n.id)
    }

    pub fn active_kind(&self) -> Option<OpenKind> {
        self.open.last().map(|n| n.kind)
    }

    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    pub fn in_code_block(&self) -> bool {
        self.fence.is_some()
    }

    /// Trigger characters still waiting for classification.
    pub fn pending_triggers(&self) -> String {
        self.triggers.iter().map(|(c, _)| *c).collect()
    }

    pub fn open_nodes(&self) -> &[OpenNode] {
        &self.open
    }
}

/// Incremental markdown renderer for one stream at a time.
#[derive(Debug, Clone)]
pub struct StreamMarkdownProcessor {
    default_code_title: String,
    state: ParserState,
}

impl StreamMarkdownProcessor {
    pub fn new() -> Self {
        Self::with_code_title(DEFAULT_CODE_TITLE)
    }

    pub fn with_code_title(title: impl Into<String>) -> Self {
        Self {
            default_code_title: title.into(),
            state: ParserState::default(),
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// The node currently receiving characters.
    pub fn active(&self) -> Option<NodeId> {
        self.state.active()
    }

    /// The most recently closed node.
    pub fn previous(&self) -> Option<NodeId> {
        self.state.previous
    }

    /// Everything processed since the last reset.
    pub fn raw_content(&self) -> &str {
        &self.state.raw
    }

    /// Forget the current stream entirely.
    pub fn dispose(&mut self) {
        debug!(chars = self.state.raw.len(), "Disposing stream state");
        self.state = ParserState::default();
    }

    /// Feed one chunk of the stream, writing below `anchor`.
    ///
    /// A missing or unknown anchor drops the chunk. A different anchor than
    /// the one the current stream started on begins a new stream.
    pub fn process_chunk<'a>(
        &mut self,
        tree: &mut NodeTree,
        chunk: &str,
        anchor: impl Into<Anchor<'a>>,
    ) {
        let Some(anchor) = anchor.into().resolve() else {
            debug!("No output anchor, chunk dropped");
            return;
        };
        if !tree.contains(anchor) {
            debug!(anchor = anchor.index(), "Unknown output anchor, chunk dropped");
            return;
        }

        if self.state.anchor != Some(anchor) {
            if self.state.anchor.is_some() {
                debug!(anchor = anchor.index(), "Output anchor changed, starting new stream");
            }
            self.state = ParserState::begin(anchor);
        }

        for c in chunk.chars() {
            self.process_char(tree, c);
        }

        if !self.state.triggers.is_empty() && !self.triggers_pending() {
            self.resolve_triggers(tree, None);
        }
    }

    /// End of stream: resolve whatever is still pending.
    ///
    /// Unterminated bold, code and headings stay open.
    pub fn finish(&mut self, tree: &mut NodeTree) {
        let Some(anchor) = self.state.anchor else {
            return;
        };
        if !tree.contains(anchor) {
            return;
        }
        if !self.state.triggers.is_empty() {
            self.resolve_triggers(tree, None);
        }
        self.fix_false_code(tree, true);
    }

    fn process_char(&mut self, tree: &mut NodeTree, c: char) {
        let offset = self.state.raw.len();
        self.state.raw.push(c);
        if c == '\r' {
            return;
        }

        if self.state.fence.is_some() {
            self.code_char(tree, c);
            return;
        }

        if classify::is_trigger(c) {
            if self.state.triggers.is_empty() {
                self.state.triggers_at_line_start = self.state.at_line_start;
            }
            self.state.triggers.push((c, offset));
            self.fix_false_code(tree, false);
            return;
        }

        if !self.state.triggers.is_empty() {
            let consumed = self.resolve_triggers(tree, Some(c));
            if self.state.fence.is_some() {
                self.code_char(tree, c);
                return;
            }
            if consumed {
                return;
            }
        }

        if c == '\n' {
            self.newline(tree);
        } else {
            self.emit(tree, |tree, id| tree.append_char(id, c));
        }
        self.state.at_line_start = c == '\n';
        self.fix_false_code(tree, false);
    }

    /// Whether the trailing run may still change with the next chunk.
    fn triggers_pending(&self) -> bool {
        let Some(&(last, _)) = self.state.triggers.last() else {
            return false;
        };
        let run_len = self
            .state
            .triggers
            .iter()
            .rev()
            .take_while(|(c, _)| *c == last)
            .count();

        let heading_possible = self.state.triggers_at_line_start
            && run_len == self.state.triggers.len();
        classify::is_open_run(last, run_len, heading_possible)
    }

    /// Resolve the whole trigger stack, run by run. `next` is the character
    /// that ended the stack, if any. Returns whether `next` was consumed.
    fn resolve_triggers(&mut self, tree: &mut NodeTree, next: Option<char>) -> bool {
        let triggers = std::mem::take(&mut self.state.triggers);
        let single_run = triggers.windows(2).all(|w| w[0].0 == w[1].0);
        let at_line_start = self.state.triggers_at_line_start && single_run;

        let runs = classify::runs(&triggers);
        let count = runs.len();
        let mut consumed = false;
        for (i, run) in runs.into_iter().enumerate() {
            if self.state.fence.is_some() {
                for _ in 0..run.len {
                    self.code_char(tree, run.ch);
                }
                continue;
            }
            let last = i + 1 == count;
            consumed |= self.resolve_run(tree, run, last && at_line_start, next.filter(|_| last));
            self.fix_false_code(tree, false);
        }

        self.state.at_line_start = false;
        consumed
    }

    fn resolve_run(
        &mut self,
        tree: &mut NodeTree,
        run: Run,
        at_line_start: bool,
        next: Option<char>,
    ) -> bool {
        trace!(run = %run.literal(), "Resolving trigger run");
        let active_kind = self.state.active_kind();

        // Inside inline code only its own delimiter means anything.
        if let Some(OpenKind::InlineCode { delimiter, .. }) = active_kind {
            if run.len == 1 && run.ch == delimiter {
                self.close();
            } else {
                self.emit_literal(tree, &run);
            }
            return false;
        }

        match classify::classify_run(run.ch, run.len) {
            RunClass::Bold => {
                if active_kind == Some(OpenKind::Bold) {
                    self.close();
                } else {
                    self.open(tree, NodeKind::Bold, OpenKind::Bold);
                }
            }
            RunClass::InlineCode => {
                self.open(
                    tree,
                    NodeKind::InlineCode,
                    OpenKind::InlineCode {
                        delimiter: run.ch,
                        opened_at: run.offset,
                    },
                );
            }
            RunClass::Fence => self.open_fence(tree),
            RunClass::HorizontalRule => {
                self.emit(tree, |tree, id| {
                    tree.append_child(id, NodeKind::HorizontalRule);
                });
            }
            RunClass::Heading(level) if at_line_start && next == Some(' ') => {
                self.open(tree, NodeKind::Heading(level), OpenKind::Heading(level));
                return true;
            }
            RunClass::Heading(_) | RunClass::Literal => self.emit_literal(tree, &run),
        }
        false
    }

    fn newline(&mut self, tree: &mut NodeTree) {
        self.state.newline_run += 1;
        let Some(active) = self.state.active() else {
            return;
        };

        match self.state.newline_run {
            1 => {
                if matches!(self.state.active_kind(), Some(OpenKind::Heading(_))) {
                    self.close();
                    return;
                }
                let after_block = match tree.last_child(active) {
                    Some(Child::Node(id)) => tree.kind(*id).is_some_and(NodeKind::is_block),
                    _ => false,
                };
                if !after_block {
                    tree.append_child(active, NodeKind::LineBreak);
                }
            }
            2 => {
                let trailing_break = matches!(
                    tree.last_child(active),
                    Some(Child::Node(id)) if tree.kind(*id) == Some(NodeKind::LineBreak)
                );
                let para = tree.append_child(active, NodeKind::Paragraph);
                tree.append_text(para, PARAGRAPH_FILL);
                if trailing_break {
                    // The separator takes the place of the first newline's break.
                    tree.detach(para);
                    tree.replace_last_child(active, Child::Node(para));
                }
            }
            _ => {}
        }
    }

    fn open_fence(&mut self, tree: &mut NodeTree) {
        self.open(tree, NodeKind::CodeBlock, OpenKind::CodeBlock);
        self.open(
            tree,
            NodeKind::CodeBlockTitle { language: false },
            OpenKind::CodeBlockTitle,
        );
        self.state.fence = Some(FenceState {
            awaiting_title: true,
            tail: String::new(),
        });
        debug!("Code block opened");
    }

    /// Handle one character inside a fenced code block.
    fn code_char(&mut self, tree: &mut NodeTree, c: char) {
        let Some(fence) = self.state.fence.as_mut() else {
            return;
        };

        if fence.awaiting_title {
            fence.awaiting_title = false;
            if !c.is_alphabetic() {
                self.close_title(tree);
                if c == '\n' {
                    return;
                }
            }
        }

        if c == '\n' && self.state.active_kind() == Some(OpenKind::CodeBlockTitle) {
            self.close_title(tree);
            return;
        }

        let Some(active) = self.state.active() else {
            return;
        };
        tree.append_char(active, c);

        let Some(fence) = self.state.fence.as_mut() else {
            return;
        };
        fence.tail.push(c);
        if fence.tail.chars().count() > 3 {
            fence.tail.remove(0);
        }
        if classify::is_closing_fence(&fence.tail) {
            let marker = std::mem::take(&mut fence.tail);
            tree.strip_text_suffix(active, &marker);
            self.close_fence(tree);
        }
    }

    fn close_title(&mut self, tree: &mut NodeTree) {
        let Some(top) = self.state.open.last().copied() else {
            return;
        };
        if top.kind != OpenKind::CodeBlockTitle {
            return;
        }
        if tree.text_content(top.id).trim().is_empty() {
            tree.append_text(top.id, &self.default_code_title);
        } else {
            tree.set_kind(top.id, NodeKind::CodeBlockTitle { language: true });
        }
        self.close();
    }

    fn close_fence(&mut self, tree: &mut NodeTree) {
        self.close_title(tree);
        if self.state.active_kind() == Some(OpenKind::CodeBlock) {
            self.close();
        }
        self.state.fence = None;
        self.state.newline_run = 0;
        debug!("Code block closed");
    }

    /// Undo inline code that was really an apostrophe.
    fn fix_false_code(&mut self, tree: &mut NodeTree, at_end: bool) {
        let Some(OpenNode {
            id,
            kind: OpenKind::InlineCode {
                delimiter: '\'',
                opened_at,
            },
        }) = self.state.open.last().copied()
        else {
            return;
        };

        let raw = &self.state.raw;
        let before = raw.get(..opened_at).and_then(|s| s.chars().next_back());
        let after = raw.get(opened_at + 1..).unwrap_or("");
        if !classify::is_false_code(before, after, at_end) {
            return;
        }

        trace!(text = after, "Apostrophe, not inline code");
        self.state.open.pop();
        let Some(parent) = self.state.active() else {
            return;
        };
        tree.detach(id);
        tree.append_text(parent, "'");
        tree.move_children(id, parent);
    }

    /// Run a mutation against the active node as new content.
    fn emit(&mut self, tree: &mut NodeTree, f: impl FnOnce(&mut NodeTree, NodeId)) {
        if let Some(active) = self.state.active() {
            f(tree, active);
            self.state.newline_run = 0;
        }
    }

    fn emit_literal(&mut self, tree: &mut NodeTree, run: &Run) {
        let text = run.literal();
        self.emit(tree, |tree, id| tree.append_text(id, &text));
    }

    fn open(&mut self, tree: &mut NodeTree, kind: NodeKind, open_kind: OpenKind) -> Option<NodeId> {
        let parent = self.state.active()?;
        let id = tree.append_child(parent, kind);
        self.state.open.push(OpenNode { id, kind: open_kind });
        self.state.newline_run = 0;
        Some(id)
    }

    /// Close the active node. The anchor itself is never closed.
    fn close(&mut self) {
        if self.state.open.len() > 1 {
            if let Some(node) = self.state.open.pop() {
                self.state.previous = Some(node.id);
            }
        }
    }
}

impl Default for StreamMarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}
