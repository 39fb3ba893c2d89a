//! Context budgeting for Tabmate.
//!
//! Decides which page content, attachments and past turns go into each LLM
//! request under a fixed token budget, and records completed turns.

pub mod context;
pub mod conversation;

pub use context::{
    AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler, ContextBudget, DropInfo,
    LayerStats,
};
pub use conversation::ConversationMemory;
