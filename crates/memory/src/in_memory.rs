//! In-memory turn store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::sync::Arc;
use tabmate_core::error::StoreError;
use tabmate_core::memory::{ConversationTurn, SessionContext, TurnStore};
use tabmate_core::message::SessionId;
use tokio::sync::RwLock;

use crate::table::TurnTable;
use crate::{require_session, validate_turn};

/// A store that keeps turns and contexts in maps.
/// Nothing survives the process.
pub struct InMemoryTurnStore {
    table: Arc<RwLock<TurnTable>>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(TurnTable::default())),
        }
    }
}

impl Default for InMemoryTurnStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TurnStore for InMemoryTurnStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store_turn(&self, turn: ConversationTurn) -> Result<(), StoreError> {
        validate_turn(&turn)?;
        self.table.write().await.insert_turn(turn);
        Ok(())
    }

    async fn recent_turns(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        Ok(self.table.read().await.recent(session_id, limit))
    }

    async fn turn_summaries(
        &self,
        session_id: &SessionId,
        skip_recent: usize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.table.read().await.summaries(session_id, skip_recent))
    }

    async fn turn_count(&self, session_id: &SessionId) -> Result<usize, StoreError> {
        Ok(self.table.read().await.count(session_id))
    }

    async fn put_context(&self, context: SessionContext) -> Result<(), StoreError> {
        require_session(&context.session_id)?;
        self.table.write().await.put_context(context);
        Ok(())
    }

    async fn context(&self, session_id: &SessionId) -> Result<Option<SessionContext>, StoreError> {
        Ok(self.table.read().await.context(session_id))
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.table.write().await.remove_session(session_id))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.table.write().await.clear();
        Ok(())
    }
}
