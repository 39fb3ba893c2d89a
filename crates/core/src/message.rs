//! Session, role and prompt-message domain types.
//!
//! These are the core value objects that flow through the system:
//! the user types a message in the sidebar → the context engine assembles
//! [`PromptMessage`]s → the endpoint streams a response → the renderer draws it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty id is never valid for storage operations.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions and injected context
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role-tagged message in the chat-completion wire shape.
///
/// This is what the context engine hands to the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A file or snippet the user attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique attachment ID
    pub id: String,

    /// MIME-ish type label ("text/plain", "pdf", "selection", ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name
    pub filename: String,

    /// Extracted text content
    pub content: String,

    /// Page the attachment was captured from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Attachment {
    /// Create a text attachment with a fresh id.
    pub fn text(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: "text/plain".into(),
            filename: filename.into(),
            content: content.into(),
            source_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_message_constructors() {
        let msg = PromptMessage::assistant("Sure.");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Sure.");
        assert_eq!(PromptMessage::system("x").role.to_string(), "system");
    }

    #[test]
    fn prompt_message_wire_shape() {
        let msg = PromptMessage::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn attachment_type_field_renamed() {
        let att = Attachment::text("notes.txt", "hello");
        let json = serde_json::to_value(&att).unwrap();
        assert_eq!(json["type"], "text/plain");
        assert!(json.get("source_url").is_none());
    }

    #[test]
    fn empty_session_id_detected() {
        assert!(SessionId::from("  ").is_empty());
        assert!(!SessionId::new().is_empty());
    }
}
