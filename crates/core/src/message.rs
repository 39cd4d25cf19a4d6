//! Message and transcript domain types.
//!
//! Two distinct message shapes flow through the loop: `ChatMessage` is the
//! wire format sent to the LLM (rebuilt fresh each call), and `Message` is
//! the display record appended once per completed agent turn.

use crate::agent::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a message in the LLM wire history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single entry in the wire history sent to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A completed agent turn as shown in the conversation view.
///
/// Append-only: once created the record is immutable, only the history vector
/// grows. `structured` is the optional trailing JSON extracted from `text`,
/// carried as an opaque value and validated by presence only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub agent: String,
    pub model: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
    #[serde(rename = "__pending", default, skip_serializing_if = "is_false")]
    pub pending: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        agent: impl Into<String>,
        model: impl Into<String>,
        text: impl Into<String>,
        structured: Option<serde_json::Value>,
    ) -> Self {
        Self {
            agent: agent.into(),
            model: model.into(),
            text: text.into(),
            structured,
            pending: false,
            timestamp: Utc::now(),
        }
    }

    /// The error row appended when a step fails.
    pub fn system_error(text: impl Into<String>) -> Self {
        Self::new("System", "", text, None)
    }
}

/// A finished loop conversation as persisted to the backend.
///
/// Field names match the backend's camelCase document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub seed_prompt: String,
    pub model_a: String,
    pub provider_a: ProviderKind,
    pub model_b: String,
    pub provider_b: ProviderKind,
    pub messages: Vec<Message>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors() {
        assert_eq!(ChatMessage::system("rules").role, ChatRole::System);
        assert_eq!(ChatMessage::user("hi").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("hello").role, ChatRole::Assistant);
    }

    #[test]
    fn message_serialization_skips_defaults() {
        let msg = Message::new("Agent A", "llama3", "an idea", None);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("structured"));
        assert!(!json.contains("__pending"));
    }

    #[test]
    fn pending_flag_round_trips() {
        let mut msg = Message::new("Agent B", "llama3", "partial", None);
        msg.pending = true;
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"__pending\":true"));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert!(back.pending);
    }

    #[test]
    fn system_error_has_no_model() {
        let msg = Message::system_error("Error: connection refused");
        assert_eq!(msg.agent, "System");
        assert!(msg.model.is_empty());
        assert!(msg.structured.is_none());
    }

    #[test]
    fn transcript_uses_camel_case_wire_names() {
        let transcript = Transcript {
            seed_prompt: "design a birdhouse".into(),
            model_a: "llama3".into(),
            provider_a: ProviderKind::Ollama,
            model_b: "mixtral".into(),
            provider_b: ProviderKind::Groq,
            messages: vec![Message::new("Agent A", "llama3", "idea", None)],
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&transcript).unwrap();
        assert!(json.contains("\"seedPrompt\""));
        assert!(json.contains("\"modelA\""));
        assert!(json.contains("\"providerB\":\"groq\""));
    }
}
