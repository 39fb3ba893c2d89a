//! Map-backed turn table shared by the in-memory and file stores.

use std::collections::{BTreeMap, HashMap};
use tabmate_core::memory::{ConversationTurn, SessionContext, older_summaries, tail_turns};
use tabmate_core::message::SessionId;

#[derive(Debug, Default)]
pub(crate) struct TurnTable {
    turns: HashMap<SessionId, BTreeMap<u32, ConversationTurn>>,
    contexts: HashMap<SessionId, SessionContext>,
}

impl TurnTable {
    /// Insert a turn; a turn with the same number is replaced.
    pub fn insert_turn(&mut self, turn: ConversationTurn) {
        self.turns
            .entry(turn.session_id.clone())
            .or_default()
            .insert(turn.turn_number, turn);
    }

    fn sorted(&self, session_id: &SessionId) -> Vec<ConversationTurn> {
        self.turns
            .get(session_id)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn recent(&self, session_id: &SessionId, limit: usize) -> Vec<ConversationTurn> {
        tail_turns(&self.sorted(session_id), limit)
    }

    pub fn summaries(&self, session_id: &SessionId, skip_recent: usize) -> Vec<String> {
        older_summaries(&self.sorted(session_id), skip_recent)
    }

    pub fn count(&self, session_id: &SessionId) -> usize {
        self.turns.get(session_id).map_or(0, BTreeMap::len)
    }

    pub fn put_context(&mut self, context: SessionContext) {
        self.contexts.insert(context.session_id.clone(), context);
    }

    pub fn context(&self, session_id: &SessionId) -> Option<SessionContext> {
        self.contexts.get(session_id).cloned()
    }

    pub fn remove_session(&mut self, session_id: &SessionId) -> bool {
        let turns = self.turns.remove(session_id).is_some();
        let context = self.contexts.remove(session_id).is_some();
        turns || context
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.contexts.clear();
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.values().flat_map(BTreeMap::values)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &SessionContext> {
        self.contexts.values()
    }
}
