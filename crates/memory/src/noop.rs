//! No-op turn store: disables conversation memory entirely.

use async_trait::async_trait;
use tabmate_core::error::StoreError;
use tabmate_core::memory::{ConversationTurn, SessionContext, TurnStore};
use tabmate_core::message::SessionId;

/// A store that keeps nothing.
pub struct NoopTurnStore;

#[async_trait]
impl TurnStore for NoopTurnStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn store_turn(&self, _turn: ConversationTurn) -> Result<(), StoreError> {
        Ok(())
    }

    async fn recent_turns(
        &self,
        _session_id: &SessionId,
        _limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        Ok(Vec::new())
    }

    async fn turn_summaries(
        &self,
        _session_id: &SessionId,
        _skip_recent: usize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn turn_count(&self, _session_id: &SessionId) -> Result<usize, StoreError> {
        Ok(0)
    }

    async fn put_context(&self, _context: SessionContext) -> Result<(), StoreError> {
        Ok(())
    }

    async fn context(&self, _session_id: &SessionId) -> Result<Option<SessionContext>, StoreError> {
        Ok(None)
    }

    async fn delete_session(&self, _session_id: &SessionId) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
