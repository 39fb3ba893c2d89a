//! Context assembly — decides what goes into each LLM request.
//!
//! Builds the ordered message list for one request from six steps:
//!
//! 1. **System** (caller instructions) — never trimmed
//! 2. **Page** — full text on the first turn or when asked for, else the summary
//! 3. **Attachments** — full content early in a session, summaries afterwards
//! 4. **History** — summaries of turns older than the working window
//! 5. **Working Memory** — the most recent turns, verbatim, whole pairs only
//! 6. **New Message** — always last, whatever the budget says
//!
//! # Failure semantics
//!
//! Assembly never fails. A store read that errors is logged and treated as
//! "no data", so the worst case is system instructions plus the new message.

use crate::context::summary;
use crate::context::token;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabmate_config::ContextConfig;
use tabmate_core::memory::{ConversationTurn, SessionContext, TurnStore};
use tabmate_core::message::{Attachment, PromptMessage, Role, SessionId};
use tracing::{debug, warn};

/// Below this many free tokens a step's content is dropped, not truncated.
const MIN_TRUNCATED_TOKENS: usize = 16;

/// Attachments are sent in full up to and including this turn.
const FULL_ATTACHMENT_TURNS: u32 = 2;

// ── Types ─────────────────────────────────────────────────────────────────

/// Token budget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBudget {
    /// Total token budget for the assembled request.
    pub total: usize,
    /// Headroom kept free for the new user message.
    pub new_message_reserve: usize,
    /// Cap for the long-term history summary.
    pub history_cap: usize,
    /// Number of recent turns replayed verbatim.
    pub recent_turns: usize,
    /// Marker in the new message that forces the full page back in.
    pub page_marker: String,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            total: 3200,
            new_message_reserve: 200,
            history_cap: 300,
            recent_turns: 3,
            page_marker: "@page".into(),
        }
    }
}

impl From<&ContextConfig> for ContextBudget {
    fn from(config: &ContextConfig) -> Self {
        Self {
            total: config.total_tokens,
            new_message_reserve: config.new_message_reserve,
            history_cap: config.history_cap,
            recent_turns: config.recent_turns,
            page_marker: config.page_marker.clone(),
        }
    }
}

/// Inputs for a single request.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub session_id: &'a SessionId,
    /// What the user just typed.
    pub new_message: &'a str,
    /// 1-based number of the turn being assembled.
    pub turn_number: u32,
    pub system_instructions: Option<&'a str>,
}

/// The assembled request, ready for the network layer.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// Ordered messages; the last one is always the new user message.
    pub messages: Vec<PromptMessage>,
    /// Assembly metadata (token counts, drops, utilization).
    pub metadata: AssemblyMetadata,
}

/// Detailed metadata about the assembly process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Total estimated tokens in the assembled messages.
    pub total_tokens: usize,
    /// Configured token budget.
    pub budget: usize,
    /// Budget utilization percentage. May exceed 100 when the system
    /// instructions or the new message alone are over budget.
    pub utilization_pct: f32,
    /// Per-step statistics.
    pub per_layer: Vec<LayerStats>,
    /// Content truncated or dropped by each step.
    pub drops: Vec<DropInfo>,
}

/// Statistics for a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStats {
    /// Layer name.
    pub name: String,
    /// Tokens consumed by this layer.
    pub tokens: usize,
    /// Items included after budget trimming.
    pub items_included: usize,
    /// Total items available before trimming.
    pub items_total: usize,
}

/// Information about content dropped or cut during budget enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropInfo {
    /// Which layer.
    pub layer: String,
    /// Number of items dropped (truncated items are not counted).
    pub items_dropped: usize,
    /// Estimated tokens of removed content.
    pub tokens_dropped: usize,
    /// Reason for dropping.
    pub reason: String,
}

/// What the store had for this session.
#[derive(Debug, Default)]
struct Fetched {
    context: Option<SessionContext>,
    recent: Vec<ConversationTurn>,
    summaries: Vec<String>,
}

/// Output of one step: its messages, stats and optional drop record.
type Layer = (Vec<PromptMessage>, LayerStats, Option<DropInfo>);

/// Running result of an assembly.
#[derive(Default)]
struct Parts {
    messages: Vec<PromptMessage>,
    per_layer: Vec<LayerStats>,
    drops: Vec<DropInfo>,
    used: usize,
}

impl Parts {
    fn add(&mut self, (messages, stats, drop): Layer) {
        self.used += stats.tokens;
        self.messages.extend(messages);
        self.per_layer.push(stats);
        self.drops.extend(drop);
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Holds no per-request state; create one and reuse it.
pub struct ContextAssembler {
    store: Arc<dyn TurnStore>,
    budget: ContextBudget,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn TurnStore>, budget: ContextBudget) -> Self {
        Self { store, budget }
    }

    /// Create an assembler with the default budget (3200 tokens).
    pub fn with_default_budget(store: Arc<dyn TurnStore>) -> Self {
        Self::new(store, ContextBudget::default())
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// The ordered message list for one request.
    pub async fn build_context(&self, input: &AssemblyInput<'_>) -> Vec<PromptMessage> {
        self.assemble(input).await.messages
    }

    /// Assemble messages plus metadata.
    ///
    /// # Algorithm
    ///
    /// 1. Fetch session context, recent turns and older summaries concurrently
    /// 2. Add system instructions, counted but never trimmed
    /// 3. Fill page → attachments → history against `total - reserve`,
    ///    truncating a step that overflows and dropping it when fewer than
    ///    16 tokens remain
    /// 4. Add recent turn pairs oldest first until one does not fit
    /// 5. Append the new message
    pub async fn assemble(&self, input: &AssemblyInput<'_>) -> AssembledContext {
        let turn_number = if input.turn_number == 0 {
            warn!(session = %input.session_id, "Turn number 0 treated as 1");
            1
        } else {
            input.turn_number
        };

        let fetched = self.fetch(input.session_id, turn_number).await;
        let available = self
            .budget
            .total
            .saturating_sub(self.budget.new_message_reserve);

        let mut parts = Parts::default();

        // ── Step 1: System instructions (never trimmed) ─────────────────────
        let system = input.system_instructions.filter(|s| !s.trim().is_empty());
        parts.add(Self::system_step(system));

        // ── Steps 2–4: budgeted layers ──────────────────────────────────────
        let context = fetched.context.as_ref();
        parts.add(self.page_step(
            context,
            input.new_message,
            turn_number,
            available.saturating_sub(parts.used),
        ));
        parts.add(Self::attachments_step(
            context,
            turn_number,
            available.saturating_sub(parts.used),
        ));
        parts.add(self.history_step(
            &fetched.summaries,
            turn_number,
            available.saturating_sub(parts.used),
        ));

        // ── Step 5: Working memory ──────────────────────────────────────────
        parts.add(self.working_memory_step(&fetched.recent, parts.used));

        // ── Step 6: New message (always, last) ──────────────────────────────
        let new_tokens = token::estimate_tokens(input.new_message);
        parts.add((
            vec![PromptMessage::user(input.new_message)],
            LayerStats {
                name: "new_message".into(),
                tokens: new_tokens,
                items_included: 1,
                items_total: 1,
            },
            None,
        ));

        let Parts {
            messages,
            per_layer,
            drops,
            used,
        } = parts;
        let utilization_pct = if self.budget.total == 0 {
            0.0
        } else {
            (used as f32 / self.budget.total as f32) * 100.0
        };
        debug!(
            session = %input.session_id,
            turn = turn_number,
            messages = messages.len(),
            tokens = used,
            "Context assembled"
        );

        AssembledContext {
            messages,
            metadata: AssemblyMetadata {
                total_tokens: used,
                budget: self.budget.total,
                utilization_pct,
                per_layer,
                drops,
            },
        }
    }

    /// Read everything the steps need, concurrently.
    async fn fetch(&self, session_id: &SessionId, turn_number: u32) -> Fetched {
        if session_id.is_empty() {
            warn!("Empty session id, assembling without stored context");
            return Fetched::default();
        }

        let wants_history = turn_number as usize > self.budget.recent_turns;
        let (context, recent, summaries) = tokio::join!(
            self.store.context(session_id),
            self.store.recent_turns(session_id, self.budget.recent_turns),
            async {
                if wants_history {
                    self.store
                        .turn_summaries(session_id, self.budget.recent_turns)
                        .await
                } else {
                    Ok(Vec::new())
                }
            },
        );

        Fetched {
            context: context.unwrap_or_else(|e| {
                warn!(store = self.store.name(), error = %e, "Failed to read session context");
                None
            }),
            recent: recent.unwrap_or_else(|e| {
                warn!(store = self.store.name(), error = %e, "Failed to read recent turns");
                Vec::new()
            }),
            summaries: summaries.unwrap_or_else(|e| {
                warn!(store = self.store.name(), error = %e, "Failed to read turn summaries");
                Vec::new()
            }),
        }
    }

    // ── Private steps ─────────────────────────────────────────────────────

    fn system_step(system: Option<&str>) -> Layer {
        let tokens = system.map_or(0, token::estimate_tokens);
        let count = usize::from(system.is_some());
        (
            system.map(PromptMessage::system).into_iter().collect(),
            LayerStats {
                name: "system".into(),
                tokens,
                items_included: count,
                items_total: count,
            },
            None,
        )
    }

    fn page_step(
        &self,
        context: Option<&SessionContext>,
        new_message: &str,
        turn_number: u32,
        remaining: usize,
    ) -> Layer {
        let layer = "page";
        let Some(ctx) = context else {
            return (Vec::new(), Self::empty_stats(layer, 0), None);
        };

        let wants_full = turn_number == 1 || new_message.contains(&self.budget.page_marker);
        let full_page = ctx.page_content.as_deref().filter(|p| !p.trim().is_empty());
        let summary = ctx.page_summary.as_deref().filter(|s| !s.trim().is_empty());

        match (wants_full, full_page, summary) {
            (true, Some(page), _) => Self::fit_single(
                layer,
                Role::User,
                format!("[Page content]\n{page}"),
                remaining,
            ),
            (_, _, Some(summary)) => Self::fit_single(
                layer,
                Role::System,
                format!("[Page summary]\n{summary}"),
                remaining,
            ),
            _ => (Vec::new(), Self::empty_stats(layer, 0), None),
        }
    }

    fn attachments_step(
        context: Option<&SessionContext>,
        turn_number: u32,
        remaining: usize,
    ) -> Layer {
        let layer = "attachments";
        let attachments: &[Attachment] = context.map_or(&[][..], |c| c.attachments.as_slice());
        if attachments.is_empty() {
            return (Vec::new(), Self::empty_stats(layer, 0), None);
        }

        if turn_number > FULL_ATTACHMENT_TURNS {
            // Stored summaries first; derive any that are missing.
            let stored = context.map_or(&[][..], |c| c.attachment_summaries.as_slice());
            let lines: Vec<String> = attachments
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    stored
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| summary::summarize_attachment(a))
                })
                .collect();
            let (messages, mut stats, drop) = Self::fit_single(
                layer,
                Role::System,
                format!("[Attachments]\n{}", lines.join("\n")),
                remaining,
            );
            stats.items_total = attachments.len();
            if !messages.is_empty() {
                stats.items_included = attachments.len();
            }
            return (messages, stats, drop);
        }

        let mut messages = Vec::new();
        let mut used = 0;
        let mut dropped = 0;
        let mut dropped_tokens = 0;
        for attachment in attachments {
            let content = format!("[Attachment: {}]\n{}", attachment.filename, attachment.content);
            let (msg, tokens, cut) = Self::fit(content, remaining.saturating_sub(used));
            dropped_tokens += cut;
            match msg {
                Some(text) => {
                    messages.push(PromptMessage::user(text));
                    used += tokens;
                }
                None => dropped += 1,
            }
        }

        let included = messages.len();
        let drop = if dropped_tokens > 0 {
            Some(DropInfo {
                layer: layer.into(),
                items_dropped: dropped,
                tokens_dropped: dropped_tokens,
                reason: "Attachment content truncated to fit budget".into(),
            })
        } else {
            None
        };
        (
            messages,
            LayerStats {
                name: layer.into(),
                tokens: used,
                items_included: included,
                items_total: attachments.len(),
            },
            drop,
        )
    }

    fn history_step(
        &self,
        summaries: &[String],
        turn_number: u32,
        remaining: usize,
    ) -> Layer {
        let layer = "history";
        if turn_number as usize <= self.budget.recent_turns || summaries.is_empty() {
            return (Vec::new(), Self::empty_stats(layer, summaries.len()), None);
        }

        let joined = summaries.join("\n");
        let capped = token::truncate_to_tokens(&joined, self.budget.history_cap);
        let (messages, mut stats, drop) = Self::fit_single(
            layer,
            Role::System,
            format!("[Conversation history]\n{capped}"),
            remaining,
        );
        stats.items_total = summaries.len();
        if !messages.is_empty() {
            stats.items_included = summaries.len();
        }
        (messages, stats, drop)
    }

    /// Recent turns, oldest first, as long as each whole pair still leaves
    /// the new-message reserve free.
    fn working_memory_step(&self, recent: &[ConversationTurn], used: usize) -> Layer {
        let layer = "working_memory";
        if recent.is_empty() {
            return (Vec::new(), Self::empty_stats(layer, 0), None);
        }

        let mut running = used;
        let mut messages = Vec::new();
        let mut included = 0;
        let mut stopped_at = None;

        for (i, turn) in recent.iter().enumerate() {
            let pair_tokens = token::estimate_tokens(&turn.user_message)
                + token::estimate_tokens(&turn.assistant_response);
            if running + pair_tokens + self.budget.new_message_reserve > self.budget.total {
                stopped_at = Some(i);
                break;
            }
            messages.push(PromptMessage::user(turn.user_message.clone()));
            messages.push(PromptMessage::assistant(turn.assistant_response.clone()));
            running += pair_tokens;
            included += 1;
        }

        let drop = stopped_at.map(|i| {
            let skipped = &recent[i..];
            DropInfo {
                layer: layer.into(),
                items_dropped: skipped.len(),
                tokens_dropped: skipped
                    .iter()
                    .map(|t| {
                        token::estimate_tokens(&t.user_message)
                            + token::estimate_tokens(&t.assistant_response)
                    })
                    .sum(),
                reason: "Turn pair exceeded remaining budget".into(),
            }
        });

        (
            messages,
            LayerStats {
                name: layer.into(),
                tokens: running - used,
                items_included: included,
                items_total: recent.len(),
            },
            drop,
        )
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    /// Fit one piece of content into `remaining` tokens.
    ///
    /// Returns the (possibly truncated) text, its tokens, and how many tokens
    /// were cut. `None` means it was dropped.
    fn fit(content: String, remaining: usize) -> (Option<String>, usize, usize) {
        let tokens = token::estimate_tokens(&content);
        if tokens <= remaining {
            return (Some(content), tokens, 0);
        }
        if remaining < MIN_TRUNCATED_TOKENS {
            return (None, 0, tokens);
        }
        let cut = token::truncate_to_tokens(&content, remaining);
        let kept = token::estimate_tokens(&cut);
        (Some(cut), kept, tokens.saturating_sub(kept))
    }

    fn fit_single(layer: &str, role: Role, content: String, remaining: usize) -> Layer {
        let (text, tokens, cut) = Self::fit(content, remaining);
        let included = usize::from(text.is_some());
        let drop = match (&text, cut) {
            (_, 0) => None,
            (Some(_), _) => Self::maybe_drop(layer, 0, cut, "Truncated to fit budget"),
            (None, _) => Self::maybe_drop(layer, 1, cut, "No budget available"),
        };
        (
            text.map(|t| PromptMessage::new(role, t)).into_iter().collect(),
            LayerStats {
                name: layer.into(),
                tokens,
                items_included: included,
                items_total: 1,
            },
            drop,
        )
    }

    fn empty_stats(layer: &str, total: usize) -> LayerStats {
        LayerStats {
            name: layer.into(),
            tokens: 0,
            items_included: 0,
            items_total: total,
        }
    }

    fn maybe_drop(layer: &str, count: usize, tokens: usize, reason: &str) -> Option<DropInfo> {
        if count > 0 || tokens > 0 {
            Some(DropInfo {
                layer: layer.into(),
                items_dropped: count,
                tokens_dropped: tokens,
                reason: reason.into(),
            })
        } else {
            None
        }
    }
}
