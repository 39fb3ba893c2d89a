//! Conversation memory — persisted turns and per-session page context.
//!
//! The context engine reads from and writes to a [`TurnStore`]. It keeps:
//! - **Turns**: one immutable record per completed user/assistant exchange
//! - **Session context**: the current page text, attachments and their
//!   derived summaries, upserted whenever they change

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::message::{Attachment, SessionId};

/// One completed exchange within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Owning session
    pub session_id: SessionId,

    /// Monotonic, 1-based position within the session
    pub turn_number: u32,

    /// What the user asked
    pub user_message: String,

    /// What the assistant answered
    pub assistant_response: String,

    /// When the exchange completed
    pub timestamp: DateTime<Utc>,

    /// Estimated token cost of the user+assistant pair
    pub tokens: usize,

    /// Short derived digest used for long-term history
    pub summary: String,
}

/// Page content and attachments currently associated with a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Owning session (the key)
    pub session_id: SessionId,

    /// Full text of the page the sidebar is attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_content: Option<String>,

    /// Derived digest of `page_content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_summary: Option<String>,

    /// Attached files
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Derived digests, parallel to `attachments`
    #[serde(default)]
    pub attachment_summaries: Vec<String>,

    /// Last upsert time
    pub timestamp: DateTime<Utc>,
}

impl SessionContext {
    /// An empty context for a session.
    pub fn empty(session_id: SessionId) -> Self {
        Self {
            session_id,
            page_content: None,
            page_summary: None,
            attachments: Vec::new(),
            attachment_summaries: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// The storage collaborator of the context engine.
///
/// Implementations: SQLite, JSONL file, in-memory (for testing), none (no-op).
///
/// Turns returned by [`recent_turns`](TurnStore::recent_turns) and summaries
/// returned by [`turn_summaries`](TurnStore::turn_summaries) are always in
/// chronological (ascending turn number) order.
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "none").
    fn name(&self) -> &str;

    /// Persist a completed turn. Storing the same `(session, turn_number)`
    /// twice keeps the last write.
    async fn store_turn(&self, turn: ConversationTurn) -> Result<(), StoreError>;

    /// Up to `limit` most recent turns of a session, oldest first.
    async fn recent_turns(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError>;

    /// Summaries of every turn except the `skip_recent` most recent ones.
    async fn turn_summaries(
        &self,
        session_id: &SessionId,
        skip_recent: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Number of stored turns for a session.
    async fn turn_count(&self, session_id: &SessionId) -> Result<usize, StoreError>;

    /// Insert or replace the context of a session.
    async fn put_context(&self, context: SessionContext) -> Result<(), StoreError>;

    /// The stored context of a session, if any.
    async fn context(&self, session_id: &SessionId) -> Result<Option<SessionContext>, StoreError>;

    /// Delete every turn and the context of a session.
    /// Returns whether anything was removed.
    async fn delete_session(&self, session_id: &SessionId) -> Result<bool, StoreError>;

    /// Remove everything.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Select the most recent `limit` turns from a chronologically sorted slice.
pub fn tail_turns(sorted: &[ConversationTurn], limit: usize) -> Vec<ConversationTurn> {
    let start = sorted.len().saturating_sub(limit);
    sorted[start..].to_vec()
}

/// Summaries of all but the `skip_recent` newest turns of a sorted slice.
pub fn older_summaries(sorted: &[ConversationTurn], skip_recent: usize) -> Vec<String> {
    let end = sorted.len().saturating_sub(skip_recent);
    sorted[..end].iter().map(|t| t.summary.clone()).collect()
}
