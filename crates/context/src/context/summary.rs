//! Derived digests stored next to turns and page context.

use tabmate_core::message::Attachment;

/// Character caps for each digest.
pub const USER_SUMMARY_CHARS: usize = 100;
pub const ASSISTANT_SUMMARY_CHARS: usize = 150;
pub const PAGE_SUMMARY_CHARS: usize = 500;
pub const ATTACHMENT_SUMMARY_CHARS: usize = 200;

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shorten to at most `max_chars` characters, `...` included.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// `"User: … | Assistant: …"`
pub fn summarize_turn(user_message: &str, assistant_response: &str) -> String {
    format!(
        "User: {} | Assistant: {}",
        truncate_chars(&collapse_whitespace(user_message), USER_SUMMARY_CHARS),
        truncate_chars(
            &collapse_whitespace(assistant_response),
            ASSISTANT_SUMMARY_CHARS
        ),
    )
}

pub fn summarize_page(page_content: &str) -> String {
    truncate_chars(&collapse_whitespace(page_content), PAGE_SUMMARY_CHARS)
}

/// `"<filename>: …"`
pub fn summarize_attachment(attachment: &Attachment) -> String {
    format!(
        "{}: {}",
        attachment.filename,
        truncate_chars(
            &collapse_whitespace(&attachment.content),
            ATTACHMENT_SUMMARY_CHARS
        ),
    )
}
