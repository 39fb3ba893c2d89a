//! # Tabmate Core
//!
//! Domain types, traits, and error definitions for the Tabmate sidebar
//! assistant. This crate has **zero framework dependencies** — it defines the
//! domain model that the renderer, the stores and the context engine build on.
//!
//! ## Design Philosophy
//!
//! Persistence is defined as a trait here ([`TurnStore`]). Implementations
//! live in `tabmate-memory`. This enables:
//! - Swapping storage backends via configuration
//! - Easy testing with mock/stub stores
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod memory;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, StoreError};
pub use memory::{ConversationTurn, SessionContext, TurnStore};
pub use message::{Attachment, PromptMessage, Role, SessionId};
