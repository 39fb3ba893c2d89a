//! Incremental streaming markdown renderer.
//!
//! Model output arrives a few characters at a time. [`StreamMarkdownProcessor`]
//! turns that stream into an ordered [`NodeTree`] (bold, inline code, fenced
//! code blocks, headings, rules, paragraph breaks) without ever re-parsing
//! what it has already seen.

pub mod classify;
pub mod html;
pub mod processor;
pub mod tree;

pub use processor::{
    Anchor, DEFAULT_CODE_TITLE, OpenKind, OpenNode, ParserState, StreamMarkdownProcessor,
};
pub use tree::{Child, Node, NodeId, NodeKind, NodeTree};

/// Render a complete text as one chunk.
pub fn render_markdown(text: &str) -> NodeTree {
    let mut tree = NodeTree::new();
    let root = tree.root();
    let mut processor = StreamMarkdownProcessor::new();
    processor.process_chunk(&mut tree, text, root);
    processor.finish(&mut tree);
    tree
}

/// Render a text streamed in chunks of `chunk_size` characters.
pub fn render_chunked(text: &str, chunk_size: usize, code_title: &str) -> NodeTree {
    let mut tree = NodeTree::new();
    let root = tree.root();
    let mut processor = StreamMarkdownProcessor::with_code_title(code_title);
    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(chunk_size.max(1)) {
        let chunk: String = chunk.iter().collect();
        processor.process_chunk(&mut tree, &chunk, root);
    }
    processor.finish(&mut tree);
    tree
}
