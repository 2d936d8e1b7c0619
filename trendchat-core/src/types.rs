//! Core type definitions for Trendchat.
//!
//! Defines the conversation data model (roles, messages, ordered
//! history) and the streaming types exchanged with LLM providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the conversation history.
///
/// Immutable once appended; conversation order is insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message with auto-generated ID and current timestamp.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// An ordered sequence of conversation turns.
///
/// Created empty on first access, appended to by the relay, wholly
/// reset by [`Conversation::clear`]. Not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, preserving insertion order.
    pub fn push(&mut self, message: Message) {
        self.turns.push(message);
    }

    /// All turns in conversation order.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Remove every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// A stream event received during LLM response streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// One incremental chunk of generated text.
    Token(String),
    /// The upstream stream terminated normally.
    Done,
}

/// A request to the LLM for a streaming completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hello");

        let msg = Message::assistant("hi there");
        assert_eq!(msg.role, Role::Assistant);

        let msg = Message::system("be brief");
        assert_eq!(msg.role, Role::System);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    }

    #[test]
    fn test_conversation_ordering() {
        let mut convo = Conversation::new();
        assert!(convo.is_empty());

        convo.push(Message::user("first"));
        convo.push(Message::assistant("second"));
        convo.push(Message::user("third"));

        let contents: Vec<&str> = convo.turns().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_conversation_clear() {
        let mut convo = Conversation::new();
        convo.push(Message::user("hello"));
        convo.push(Message::assistant("hi"));
        assert_eq!(convo.len(), 2);

        convo.clear();
        assert!(convo.is_empty());
    }
}
