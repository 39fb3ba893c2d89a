//! Turn storage implementations for Tabmate.

pub mod file_backend;
pub mod in_memory;
pub mod noop;
mod table;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileTurnStore;
pub use in_memory::InMemoryTurnStore;
pub use noop::NoopTurnStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTurnStore;

use tabmate_core::error::StoreError;
use tabmate_core::memory::ConversationTurn;
use tabmate_core::message::SessionId;

/// Reject ids that cannot key a session.
pub(crate) fn require_session(session_id: &SessionId) -> Result<(), StoreError> {
    if session_id.is_empty() {
        return Err(StoreError::InvalidArgument("empty session id".into()));
    }
    Ok(())
}

/// Reject turns that cannot be stored.
pub(crate) fn validate_turn(turn: &ConversationTurn) -> Result<(), StoreError> {
    require_session(&turn.session_id)?;
    if turn.turn_number == 0 {
        return Err(StoreError::InvalidArgument("turn numbers start at 1".into()));
    }
    Ok(())
}
