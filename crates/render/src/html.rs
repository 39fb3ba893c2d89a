//! HTML serialization of a [`NodeTree`].

use crate::tree::{Child, NodeId, NodeKind, NodeTree};

impl NodeTree {
    /// Render a node and everything below it as HTML.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, id, &mut out);
        out
    }

    /// Render only the children of a node.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_children(self, id, &mut out);
        out
    }
}

fn write_node(tree: &NodeTree, id: NodeId, out: &mut String) {
    let Some(kind) = tree.kind(id) else {
        return;
    };
    match kind {
        NodeKind::LineBreak => out.push_str("<br>"),
        NodeKind::HorizontalRule => out.push_str("<hr>"),
        NodeKind::CodeBlock => write_code_block(tree, id, out),
        NodeKind::Container => wrap(tree, id, "<div>", "</div>", out),
        NodeKind::Paragraph => wrap(tree, id, "<p>", "</p>", out),
        NodeKind::Bold => wrap(tree, id, "<strong>", "</strong>", out),
        NodeKind::InlineCode => wrap(tree, id, "<code>", "</code>", out),
        NodeKind::CodeBlockTitle { .. } => wrap(
            tree,
            id,
            "<div class=\"code-block-title\">",
            "</div>",
            out,
        ),
        NodeKind::Heading(level) => {
            out.push_str(&format!("<h{level}>"));
            write_children(tree, id, out);
            out.push_str(&format!("</h{level}>"));
        }
    }
}

fn wrap(tree: &NodeTree, id: NodeId, open: &str, close: &str, out: &mut String) {
    out.push_str(open);
    write_children(tree, id, out);
    out.push_str(close);
}

fn write_children(tree: &NodeTree, id: NodeId, out: &mut String) {
    for child in tree.children(id) {
        match child {
            Child::Text(text) => escape_into(text, out),
            Child::Node(n) => write_node(tree, *n, out),
        }
    }
}

/// Title first, then the body text in a `<pre><code>` element.
fn write_code_block(tree: &NodeTree, id: NodeId, out: &mut String) {
    out.push_str("<div class=\"code-block\">");

    let mut language = None;
    let mut body = String::new();
    for child in tree.children(id) {
        match child {
            Child::Node(n) => match tree.kind(*n) {
                Some(NodeKind::CodeBlockTitle { language: labelled }) => {
                    if labelled {
                        language = Some(language_class(&tree.text_content(*n)));
                    }
                    write_node(tree, *n, out);
                }
                _ => body.push_str(&tree.text_content(*n)),
            },
            Child::Text(text) => body.push_str(text),
        }
    }

    match language {
        Some(lang) if !lang.is_empty() => {
            out.push_str(&format!("<pre><code class=\"language-{lang}\">"));
        }
        _ => out.push_str("<pre><code>"),
    }
    escape_into(&body, out);
    out.push_str("</code></pre></div>");
}

fn language_class(title: &str) -> String {
    title
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '+' | '#' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
