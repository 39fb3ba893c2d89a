//! End-to-end integration tests for Tabmate.
//!
//! These tests exercise the full sidebar pipeline: page context is stored,
//! each turn's context is assembled under budget, the streamed answer is
//! rendered chunk by chunk, and the completed turn is recorded.

use std::sync::Arc;

use tabmate_context::{ContextBudget, ConversationMemory};
use tabmate_core::error::StoreError;
use tabmate_core::memory::{ConversationTurn, SessionContext, TurnStore};
use tabmate_core::message::{Attachment, Role, SessionId};
use tabmate_memory::{FileTurnStore, InMemoryTurnStore};
use tabmate_render::{NodeKind, NodeTree, StreamMarkdownProcessor};

// ── Helpers ──────────────────────────────────────────────────────────────

/// Feed `response` to a fresh anchor under the root, `chunk` chars at a time.
fn stream_answer(
    tree: &mut NodeTree,
    processor: &mut StreamMarkdownProcessor,
    response: &str,
    chunk: usize,
) -> tabmate_render::NodeId {
    let root = tree.root();
    let anchor = tree.append_child(root, NodeKind::Container);
    let chars: Vec<char> = response.chars().collect();
    for piece in chars.chunks(chunk) {
        let piece: String = piece.iter().collect();
        processor.process_chunk(tree, &piece, anchor);
    }
    processor.finish(tree);
    anchor
}

const PAGE: &str = "Sourdough bread is leavened by a starter of wild yeast and \
                    lactic acid bacteria. It needs flour, water and salt.";

const ANSWERS: [&str; 5] = [
    "It's a **naturally leavened** bread.",
    "Use `100g` starter per `500g` flour.",
    "## Steps\nMix, rest, fold.\n\nThen bake.",
    "```\nbake(230)\n```",
    "That's all there is to it.",
];

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sidebar_session_flow() {
    let memory = ConversationMemory::new(Arc::new(InMemoryTurnStore::new()), ContextBudget::default());
    let session = SessionId::from("tab-42");
    memory
        .store_context(
            &session,
            Some(PAGE),
            vec![Attachment::text("recipe.txt", "500g flour\n350g water\n10g salt")],
        )
        .await
        .unwrap();

    let mut tree = NodeTree::new();
    let mut processor = StreamMarkdownProcessor::new();

    for (i, answer) in ANSWERS.iter().enumerate() {
        let turn = memory.next_turn_number(&session).await;
        assert_eq!(turn as usize, i + 1);

        let question = format!("question {turn}");
        let messages = memory
            .build_context(&session, &question, turn, Some("You help with the open page."))
            .await;
        assert_eq!(messages.first().unwrap().role, Role::System);
        assert_eq!(messages.last().unwrap().content, question);

        let has_full_page = messages
            .iter()
            .any(|m| m.role == Role::User && m.content.contains("wild yeast"));
        assert_eq!(has_full_page, turn == 1);

        let anchor = stream_answer(&mut tree, &mut processor, answer, 3);
        assert_eq!(processor.state().anchor(), Some(anchor));

        memory
            .store_turn(&session, turn, &question, answer)
            .await
            .unwrap();
    }

    // One container per answer, nothing leaked between them.
    assert_eq!(tree.children(tree.root()).len(), ANSWERS.len());
    assert_eq!(tree.find_all(NodeKind::Bold).len(), 1);
    assert_eq!(tree.find_all(NodeKind::InlineCode).len(), 2);
    assert_eq!(tree.find_all(NodeKind::Heading(2)).len(), 1);
    assert_eq!(tree.find_all(NodeKind::CodeBlock).len(), 1);

    let html = tree.inner_html(tree.root());
    assert!(html.contains("It's a "));
    assert!(html.contains("<strong>naturally leavened</strong>"));
    assert!(html.contains("That's all"));

    let messages = memory.build_context(&session, "One more?", 6, None).await;
    let history = messages
        .iter()
        .find(|m| m.content.starts_with("[Conversation history]"))
        .unwrap();
    assert!(history.content.contains("question 1"));
    assert!(history.content.contains("question 2"));
    assert!(!history.content.contains("question 3"));
    assert!(messages
        .iter()
        .any(|m| m.content.starts_with("[Attachments]\nrecipe.txt: 500g flour 350g water")));
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory").join("turns.jsonl");
    let session = SessionId::from("tab-1");

    {
        let memory = ConversationMemory::new(
            Arc::new(FileTurnStore::new(path.clone())),
            ContextBudget::default(),
        );
        memory.store_context(&session, Some(PAGE), Vec::new()).await.unwrap();
        for n in 1..=4 {
            memory
                .store_turn(&session, n, &format!("q{n}"), &format!("a{n}"))
                .await
                .unwrap();
        }
    }

    let memory = ConversationMemory::new(Arc::new(FileTurnStore::new(path)), ContextBudget::default());
    assert_eq!(memory.next_turn_number(&session).await, 5);

    let messages = memory.build_context(&session, "and?", 5, None).await;
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert!(contents[0].starts_with("[Page summary]\nSourdough"));
    assert!(contents[1].starts_with("[Conversation history]\nUser: q1 | Assistant: a1"));
    assert_eq!(&contents[2..], &["q2", "a2", "q3", "a3", "q4", "a4", "and?"]);
}

/// A store that accepts writes but cannot be read.
struct WriteOnlyStore {
    inner: InMemoryTurnStore,
}

#[async_trait::async_trait]
impl TurnStore for WriteOnlyStore {
    fn name(&self) -> &str {
        "write-only"
    }
    async fn store_turn(&self, turn: ConversationTurn) -> Result<(), StoreError> {
        self.inner.store_turn(turn).await
    }
    async fn recent_turns(
        &self,
        _session_id: &SessionId,
        _limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        Err(StoreError::QueryFailed("database is locked".into()))
    }
    async fn turn_summaries(
        &self,
        _session_id: &SessionId,
        _skip_recent: usize,
    ) -> Result<Vec<String>, StoreError> {
        Err(StoreError::QueryFailed("database is locked".into()))
    }
    async fn turn_count(&self, session_id: &SessionId) -> Result<usize, StoreError> {
        self.inner.turn_count(session_id).await
    }
    async fn put_context(&self, context: SessionContext) -> Result<(), StoreError> {
        self.inner.put_context(context).await
    }
    async fn context(&self, _session_id: &SessionId) -> Result<Option<SessionContext>, StoreError> {
        Err(StoreError::QueryFailed("database is locked".into()))
    }
    async fn delete_session(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        self.inner.delete_session(session_id).await
    }
    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear().await
    }
}

#[tokio::test]
async fn unreadable_store_still_answers() {
    let memory = ConversationMemory::new(
        Arc::new(WriteOnlyStore {
            inner: InMemoryTurnStore::new(),
        }),
        ContextBudget::default(),
    );
    let session = SessionId::from("tab-9");
    memory.store_context(&session, Some(PAGE), Vec::new()).await.unwrap();
    for n in 1..=5 {
        memory.store_turn(&session, n, "q", "a").await.unwrap();
    }

    let messages = memory
        .build_context(&session, "still there?", 6, Some("Be helpful."))
        .await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Be helpful.");
    assert_eq!(messages[1].content, "still there?");
}

#[tokio::test]
async fn tight_budget_keeps_order_and_last_message() {
    let budget = ContextBudget {
        total: 260,
        new_message_reserve: 200,
        ..ContextBudget::default()
    };
    let memory = ConversationMemory::new(Arc::new(InMemoryTurnStore::new()), budget);
    let session = SessionId::from("tab-3");
    memory
        .store_context(&session, Some(&PAGE.repeat(20)), Vec::new())
        .await
        .unwrap();
    for n in 1..=3 {
        memory
            .store_turn(&session, n, &"long question ".repeat(10), &"long answer ".repeat(10))
            .await
            .unwrap();
    }

    let assembled = memory.assemble(&session, "short", 4, None).await;
    let last = assembled.messages.last().unwrap();
    assert_eq!(last.role, Role::User);
    assert_eq!(last.content, "short");

    // The page summary had to be cut; no turn pair fits in what is left.
    let page = &assembled.messages[0];
    assert!(page.content.starts_with("[Page summary]"));
    assert!(page.content.ends_with("..."));
    assert_eq!(assembled.messages.len(), 2);
    assert!(assembled.metadata.drops.iter().any(|d| d.layer == "page"));
    assert!(assembled
        .metadata
        .drops
        .iter()
        .any(|d| d.layer == "working_memory" && d.items_dropped == 3));
}
