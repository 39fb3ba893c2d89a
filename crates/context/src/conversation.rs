//! Conversation memory — the write side of the context engine.
//!
//! Records completed turns and page context with their derived summaries,
//! and hands reads to the [`ContextAssembler`]. Store failures are logged
//! and reported as `None`/defaults, never as errors.

use std::sync::Arc;

use chrono::Utc;
use tabmate_core::memory::{ConversationTurn, SessionContext, TurnStore};
use tabmate_core::message::{Attachment, PromptMessage, SessionId};
use tracing::{debug, warn};

use crate::context::assembler::{AssembledContext, AssemblyInput, ContextAssembler, ContextBudget};
use crate::context::{summary, token};

/// Per-session conversation memory backed by a [`TurnStore`].
pub struct ConversationMemory {
    store: Arc<dyn TurnStore>,
    assembler: ContextAssembler,
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn TurnStore>, budget: ContextBudget) -> Self {
        Self {
            assembler: ContextAssembler::new(store.clone(), budget),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn TurnStore> {
        &self.store
    }

    pub fn budget(&self) -> &ContextBudget {
        self.assembler.budget()
    }

    /// Record one completed exchange.
    pub async fn store_turn(
        &self,
        session_id: &SessionId,
        turn_number: u32,
        user_message: &str,
        assistant_response: &str,
    ) -> Option<ConversationTurn> {
        let turn = ConversationTurn {
            session_id: session_id.clone(),
            turn_number,
            user_message: user_message.to_string(),
            assistant_response: assistant_response.to_string(),
            timestamp: Utc::now(),
            tokens: token::estimate_tokens(user_message) + token::estimate_tokens(assistant_response),
            summary: summary::summarize_turn(user_message, assistant_response),
        };

        match self.store.store_turn(turn.clone()).await {
            Ok(()) => {
                debug!(session = %session_id, turn = turn_number, tokens = turn.tokens, "Turn stored");
                Some(turn)
            }
            Err(e) => {
                warn!(session = %session_id, turn = turn_number, error = %e, "Failed to store turn");
                None
            }
        }
    }

    /// Replace the page content and attachments of a session.
    ///
    /// Summaries are derived here so later turns can use them without
    /// touching the full text.
    pub async fn store_context(
        &self,
        session_id: &SessionId,
        page_content: Option<&str>,
        attachments: Vec<Attachment>,
    ) -> Option<SessionContext> {
        let page_content = page_content.filter(|p| !p.trim().is_empty());
        let context = SessionContext {
            session_id: session_id.clone(),
            page_content: page_content.map(str::to_string),
            page_summary: page_content.map(summary::summarize_page),
            attachment_summaries: attachments.iter().map(summary::summarize_attachment).collect(),
            attachments,
            timestamp: Utc::now(),
        };

        match self.store.put_context(context.clone()).await {
            Ok(()) => {
                debug!(
                    session = %session_id,
                    attachments = context.attachments.len(),
                    "Session context stored"
                );
                Some(context)
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "Failed to store session context");
                None
            }
        }
    }

    pub async fn build_context(
        &self,
        session_id: &SessionId,
        new_message: &str,
        turn_number: u32,
        system_instructions: Option<&str>,
    ) -> Vec<PromptMessage> {
        self.assemble(session_id, new_message, turn_number, system_instructions)
            .await
            .messages
    }

    pub async fn assemble(
        &self,
        session_id: &SessionId,
        new_message: &str,
        turn_number: u32,
        system_instructions: Option<&str>,
    ) -> AssembledContext {
        self.assembler
            .assemble(&AssemblyInput {
                session_id,
                new_message,
                turn_number,
                system_instructions,
            })
            .await
    }

    /// Stored turns for a session; 0 when the store cannot be read.
    pub async fn turn_count(&self, session_id: &SessionId) -> usize {
        self.store.turn_count(session_id).await.unwrap_or_else(|e| {
            warn!(session = %session_id, error = %e, "Failed to count turns");
            0
        })
    }

    /// The number the next completed turn should be stored under.
    pub async fn next_turn_number(&self, session_id: &SessionId) -> u32 {
        let count = self.turn_count(session_id).await;
        u32::try_from(count).unwrap_or(u32::MAX - 1) + 1
    }

    /// Forget a session. Returns whether anything was removed.
    pub async fn clear_session(&self, session_id: &SessionId) -> bool {
        match self.store.delete_session(session_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(session = %session_id, error = %e, "Failed to clear session");
                false
            }
        }
    }
}
