//! Budgeted context assembly.
//!
//! # Steps (in order)
//!
//! | Step | Source | Trim Strategy |
//! |------|--------|---------------|
//! | 1. System | Caller instructions | Never trimmed |
//! | 2. Page | Full page on turn 1 or `@page`, else summary | Truncated to remaining budget |
//! | 3. Attachments | Full content on turns 1–2, else summaries | Truncated per message |
//! | 4. History | Summaries of older turns | Capped, then truncated |
//! | 5. Working Memory | Last 3 turns verbatim | Whole pairs dropped |
//! | 6. New Message | The user's input | Always included, last |

pub mod assembler;
pub mod summary;
pub mod token;

pub use assembler::{
    AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler, ContextBudget, DropInfo,
    LayerStats,
};
