//! Ordered output tree.
//!
//! An arena of nodes addressed by copyable [`NodeId`] handles. Each node owns
//! an ordered list of children, which are either text runs or other nodes:
//! "a **b** c" is stored as `[Text("a "), Node(bold), Text(" c")]`.
//!
//! Detached nodes stay in the arena but are no longer reachable from the root.

/// Handle to a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plain grouping element (the root, one per streamed turn)
    Container,
    /// Paragraph separator
    Paragraph,
    Bold,
    InlineCode,
    /// Fenced code block: a title child followed by the code text
    CodeBlock,
    /// Title of a code block; `language` is set when it came from the fence
    /// line rather than the default title
    CodeBlockTitle { language: bool },
    /// Heading of level 1..=6
    Heading(u8),
    LineBreak,
    HorizontalRule,
}

impl NodeKind {
    /// Block-level nodes swallow a single newline that directly follows them.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Self::Paragraph | Self::CodeBlock | Self::Heading(_) | Self::HorizontalRule
        )
    }
}

/// One entry in a node's ordered child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Text(String),
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<Child>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
        }
    }
}

/// Arena-backed output tree with a plain container at the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Container, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].children.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.kind = kind;
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children of a node; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[Child] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn last_child(&self, id: NodeId) -> Option<&Child> {
        self.children(id).last()
    }

    /// Create a node of `kind` as the last child of `parent`.
    ///
    /// An unknown parent yields a detached node.
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let attached = self.contains(parent);
        self.nodes.push(Node::new(kind, attached.then_some(parent)));
        if attached {
            self.nodes[parent.0].children.push(Child::Node(id));
        }
        id
    }

    /// Append text to a node, merging with a trailing text run.
    pub fn append_text(&mut self, id: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        match node.children.last_mut() {
            Some(Child::Text(last)) => last.push_str(text),
            _ => node.children.push(Child::Text(text.to_string())),
        }
    }

    pub fn append_char(&mut self, id: NodeId, c: char) {
        let mut buf = [0u8; 4];
        self.append_text(id, c.encode_utf8(&mut buf));
    }

    /// Replace the last child of a node, returning the previous one.
    ///
    /// A replaced node child is detached; a new node child is re-parented.
    pub fn replace_last_child(&mut self, id: NodeId, child: Child) -> Option<Child> {
        let old = self.nodes.get_mut(id.0)?.children.pop()?;
        if let Child::Node(old_id) = old {
            if let Some(n) = self.nodes.get_mut(old_id.0) {
                n.parent = None;
            }
        }
        self.push_child(id, child);
        Some(old)
    }

    /// Remove a node from its parent. Returns `false` if it was not attached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let siblings = &mut self.nodes[parent.0].children;
        let Some(pos) = siblings.iter().position(|c| *c == Child::Node(id)) else {
            return false;
        };
        siblings.remove(pos);

        // Keep text runs canonical: no two adjacent text children.
        if pos > 0 && pos < siblings.len() {
            let both_text = matches!(siblings[pos - 1], Child::Text(_))
                && matches!(siblings[pos], Child::Text(_));
            if both_text {
                if let Child::Text(next) = siblings.remove(pos) {
                    if let Child::Text(prev) = &mut siblings[pos - 1] {
                        prev.push_str(&next);
                    }
                }
            }
        }

        self.nodes[id.0].parent = None;
        true
    }

    /// Move every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        if from == to || !self.contains(to) {
            return;
        }
        let Some(node) = self.nodes.get_mut(from.0) else {
            return;
        };
        for child in std::mem::take(&mut node.children) {
            self.push_child(to, child);
        }
    }

    /// Strip `suffix` from the trailing text run of a node.
    pub fn strip_text_suffix(&mut self, id: NodeId, suffix: &str) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        let Some(Child::Text(last)) = node.children.last_mut() else {
            return false;
        };
        if !last.ends_with(suffix) {
            return false;
        }
        last.truncate(last.len() - suffix.len());
        if last.is_empty() {
            node.children.pop();
        }
        true
    }

    /// Concatenated text below a node. Line breaks read as `\n`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Node(n) => match self.kind(*n) {
                    Some(NodeKind::LineBreak) => out.push('\n'),
                    Some(NodeKind::HorizontalRule) | None => {}
                    Some(_) => self.collect_text(*n, out),
                },
            }
        }
    }

    /// Nodes reachable from `id` (excluding it), in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.child_nodes(id).rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.child_nodes(next).rev());
        }
        out
    }

    /// Reachable nodes of a kind below the root, in document order.
    pub fn find_all(&self, kind: NodeKind) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.kind(*id) == Some(kind))
            .collect()
    }

    fn child_nodes(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.children(id).iter().filter_map(|c| match c {
            Child::Node(n) => Some(*n),
            Child::Text(_) => None,
        })
    }

    fn push_child(&mut self, parent: NodeId, child: Child) {
        match child {
            Child::Text(text) => self.append_text(parent, &text),
            Child::Node(n) => {
                if let Some(node) = self.nodes.get_mut(n.0) {
                    node.parent = Some(parent);
                }
                if let Some(p) = self.nodes.get_mut(parent.0) {
                    p.children.push(Child::Node(n));
                }
            }
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_has_root_container() {
        let tree = NodeTree::new();
        assert_eq!(tree.kind(tree.root()), Some(NodeKind::Container));
        assert!(tree.is_empty());
    }

    #[test]
    fn text_runs_merge() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.append_text(root, "ab");
        tree.append_char(root, 'c');
        assert_eq!(tree.children(root), &[Child::Text("abc".into())]);
    }

    #[test]
    fn interleaved_children_keep_order() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.append_text(root, "a ");
        let bold = tree.append_child(root, NodeKind::Bold);
        tree.append_text(bold, "b");
        tree.append_text(root, " c");
        assert_eq!(tree.children(root).len(), 3);
        assert_eq!(tree.text_content(root), "a b c");
        assert_eq!(tree.parent(bold), Some(root));
    }

    #[test]
    fn detach_merges_neighbouring_text() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.append_text(root, "x");
        let code = tree.append_child(root, NodeKind::InlineCode);
        tree.append_text(root, "y");
        assert!(tree.detach(code));
        assert_eq!(tree.children(root), &[Child::Text("xy".into())]);
        assert_eq!(tree.parent(code), None);
        assert!(!tree.detach(code));
    }

    #[test]
    fn move_children_merges_text() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.append_text(root, "it'");
        let code = tree.append_child(root, NodeKind::InlineCode);
        tree.append_text(code, "s ");
        tree.detach(code);
        tree.move_children(code, root);
        assert_eq!(tree.children(root), &[Child::Text("it's ".into())]);
        assert!(tree.children(code).is_empty());
    }

    #[test]
    fn replace_last_child_swaps_node() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let br = tree.append_child(root, NodeKind::LineBreak);
        let p = tree.append_child(root, NodeKind::Paragraph);
        tree.detach(p);
        let old = tree.replace_last_child(root, Child::Node(p));
        assert_eq!(old, Some(Child::Node(br)));
        assert_eq!(tree.parent(br), None);
        assert_eq!(tree.parent(p), Some(root));
        assert!(tree.find_all(NodeKind::LineBreak).is_empty());
    }

    #[test]
    fn strip_suffix_removes_empty_run() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.append_text(root, "```");
        assert!(tree.strip_text_suffix(root, "```"));
        assert!(tree.children(root).is_empty());
        assert!(!tree.strip_text_suffix(root, "```"));
    }

    #[test]
    fn find_all_in_document_order() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.append_child(root, NodeKind::Bold);
        let inner = tree.append_child(a, NodeKind::InlineCode);
        let b = tree.append_child(root, NodeKind::Bold);
        assert_eq!(tree.find_all(NodeKind::Bold), vec![a, b]);
        assert_eq!(tree.descendants(root), vec![a, inner, b]);
    }

    #[test]
    fn unknown_ids_are_harmless() {
        let mut tree = NodeTree::new();
        let bogus = NodeId(42);
        assert!(!tree.contains(bogus));
        tree.append_text(bogus, "x");
        assert!(tree.children(bogus).is_empty());
        let orphan = tree.append_child(bogus, NodeKind::Bold);
        assert_eq!(tree.parent(orphan), None);
        assert!(tree.find_all(NodeKind::Bold).is_empty());
    }
}
