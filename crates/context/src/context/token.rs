//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. Characters,
//! not bytes, so non-ASCII text is not over-counted.

use tabmate_core::message::PromptMessage;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for one prompt message (content only).
pub fn estimate_message_tokens(message: &PromptMessage) -> usize {
    estimate_tokens(&message.content)
}

/// Estimate tokens for a slice of prompt messages.
pub fn estimate_messages_tokens(messages: &[PromptMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Cut text down to at most `max_tokens`, marking the cut with `...`.
///
/// Text that already fits is returned unchanged.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    let keep = (max_tokens * 4).saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
