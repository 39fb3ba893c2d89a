//! Stream-level behavior of the markdown processor: chunking, turn resets
//! and inputs that must never break it.

use tabmate_render::{
    Child, NodeKind, NodeTree, StreamMarkdownProcessor, render_chunked, render_markdown,
};

const CORPUS: &[&str] = &[
    "**bold** and `code`",
    "it's a test, don't panic",
    "```python\ndef f():\n    pass\n```\nafter",
    "# Title\nBody text\n\nNext paragraph",
    "---\nrule above",
    "**`x`** y",
    "the dogs' bone at five o'clock",
    "## Steps\n1. run `cargo`\n2. **check**\n\n===\ndone",
    "----\nx",
    "***x***",
    "=====\ny",
    "````\nx",
    "a `b``c` d",
    "***** and ##### mid # line",
];

fn render_split(text: &str, at: usize) -> NodeTree {
    let mut tree = NodeTree::new();
    let root = tree.root();
    let mut p = StreamMarkdownProcessor::new();
    let (a, b) = text.split_at(at);
    p.process_chunk(&mut tree, a, root);
    p.process_chunk(&mut tree, b, root);
    p.finish(&mut tree);
    tree
}

#[test]
fn bold_chunking_is_invisible() {
    let whole = render_markdown("**bold**");
    let by_char = render_chunked("**bold**", 1, "Source");
    assert_eq!(whole, by_char);
}

#[test]
fn every_split_point_gives_the_same_tree() {
    for text in CORPUS {
        let whole = render_markdown(text);
        for at in (0..=text.len()).filter(|i| text.is_char_boundary(*i)) {
            assert_eq!(render_split(text, at), whole, "split of {text:?} at {at}");
        }
    }
}

#[test]
fn every_chunk_size_gives_the_same_tree() {
    for text in CORPUS {
        let whole = render_markdown(text);
        for size in 1..=7 {
            assert_eq!(render_chunked(text, size, "Source"), whole, "{text:?} in chunks of {size}");
        }
    }
}

#[test]
fn bold_hello() {
    let mut tree = NodeTree::new();
    let root = tree.root();
    let mut p = StreamMarkdownProcessor::new();
    p.process_chunk(&mut tree, "**hello**", root);
    p.finish(&mut tree);

    let bold = tree.find_all(NodeKind::Bold);
    assert_eq!(bold.len(), 1);
    assert_eq!(tree.children(bold[0]), &[Child::Text("hello".into())]);
    assert_eq!(p.active(), Some(root));
}

#[test]
fn inline_code() {
    let tree = render_markdown("`code`");
    let code = tree.find_all(NodeKind::InlineCode);
    assert_eq!(code.len(), 1);
    assert_eq!(tree.text_content(code[0]), "code");
}

#[test]
fn contraction_is_plain_text() {
    let tree = render_markdown("it's a test");
    assert!(tree.find_all(NodeKind::InlineCode).is_empty());
    assert_eq!(tree.children(tree.root()), &[Child::Text("it's a test".into())]);
}

#[test]
fn fenced_block_with_language() {
    let tree = render_markdown("```python\ndef f():\n    pass\n```");
    let blocks = tree.find_all(NodeKind::CodeBlock);
    assert_eq!(blocks.len(), 1);
    let title = tree.find_all(NodeKind::CodeBlockTitle { language: true })[0];
    assert_eq!(tree.text_content(title), "python");
    assert_eq!(
        tree.children(blocks[0]).last(),
        Some(&Child::Text("def f():\n    pass\n".into()))
    );
}

#[test]
fn horizontal_rule_leaves_active_alone() {
    let mut tree = NodeTree::new();
    let root = tree.root();
    let mut p = StreamMarkdownProcessor::new();
    p.process_chunk(&mut tree, "---", root);
    p.finish(&mut tree);
    assert_eq!(tree.find_all(NodeKind::HorizontalRule).len(), 1);
    assert_eq!(p.active(), Some(root));
}

#[test]
fn dispose_then_replay_is_identical() {
    let input = ["Some **bold", "** text\n", "```\nx\n```"];
    let mut p = StreamMarkdownProcessor::new();

    let mut first = NodeTree::new();
    let root = first.root();
    for chunk in input {
        p.process_chunk(&mut first, chunk, root);
    }
    p.dispose();

    let mut second = NodeTree::new();
    let root = second.root();
    for chunk in input {
        p.process_chunk(&mut second, chunk, root);
    }
    assert_eq!(first, second);
}

#[test]
fn turns_do_not_leak_state() {
    let mut tree = NodeTree::new();
    let root = tree.root();
    let turn1 = tree.append_child(root, NodeKind::Container);
    let turn2 = tree.append_child(root, NodeKind::Container);
    let mut p = StreamMarkdownProcessor::new();

    p.process_chunk(&mut tree, "```\nnever closed", turn1);
    p.process_chunk(&mut tree, "**fresh**", turn2);

    assert!(!p.state().in_code_block());
    let bold = tree.find_all(NodeKind::Bold);
    assert_eq!(bold.len(), 1);
    assert_eq!(tree.parent(bold[0]), Some(turn2));
}

#[test]
fn bold_wraps_inline_code() {
    let tree = render_markdown("**`x`**");
    let bold = tree.find_all(NodeKind::Bold);
    assert_eq!(bold.len(), 1);
    let code = tree.find_all(NodeKind::InlineCode);
    assert_eq!(code.len(), 1);
    assert_eq!(tree.parent(code[0]), Some(bold[0]));
    assert_eq!(tree.text_content(code[0]), "x");
}

#[test]
fn heading_then_body() {
    let tree = render_markdown("## Title\nBody");
    let heading = tree.find_all(NodeKind::Heading(2));
    assert_eq!(heading.len(), 1);
    assert_eq!(tree.text_content(heading[0]), "Title");
    assert_eq!(tree.children(tree.root()).last(), Some(&Child::Text("Body".into())));
}

#[test]
fn double_newline_becomes_paragraph() {
    let tree = render_markdown("one\n\ntwo");
    assert!(tree.find_all(NodeKind::LineBreak).is_empty());
    assert_eq!(tree.find_all(NodeKind::Paragraph).len(), 1);
    assert_eq!(tree.text_content(tree.root()), "one\u{a0}two");
}

#[test]
fn raw_content_tracks_input() {
    let mut tree = NodeTree::new();
    let root = tree.root();
    let mut p = StreamMarkdownProcessor::new();
    p.process_chunk(&mut tree, "**a", root);
    p.process_chunk(&mut tree, "**\r\n", root);
    assert_eq!(p.raw_content(), "**a**\r\n");
}

#[test]
fn adversarial_input_never_panics() {
    let nasty = [
        "",
        "*",
        "'''",
        "``````````",
        "#######",
        "# ",
        "**__**__",
        "'`'`'`",
        "```\n```\n```",
        "--- === +++ ___",
        "\n\n\n\n",
        "s'",
        "'s",
        "it''s",
        "ü**ñ**´'é'",
        "😀`😀`'😀'",
        "**unterminated `code and ```fence",
        "\r\r\r",
    ];
    for text in nasty {
        for size in 1..=4 {
            let tree = render_chunked(text, size, "Source");
            let _ = tree.to_html(tree.root());
        }
    }
}
