use serde::{Deserialize, Serialize};

use super::common::ensure_length;
use crate::error::Result;

const MAX_MESSAGE_CHARS: usize = 4000;

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
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

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatMessage>>,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_length("message", &self.message, 1, MAX_MESSAGE_CHARS)?;
        ensure_length("language", &self.language, 1, 16)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TourismRequest {
    pub query: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl TourismRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_length("query", &self.query, 1, MAX_MESSAGE_CHARS)?;
        ensure_length("language", &self.language, 1, 16)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageQuery {
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelpQuery {
    pub topic: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Single assistant answer
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_roles_are_restricted() {
        let ok: ChatRequest = serde_json::from_str(
            r#"{"message":"hi","conversation_history":[{"role":"assistant","content":"hello"}]}"#,
        )
        .unwrap();
        assert_eq!(ok.language, "en");
        assert_eq!(ok.conversation_history.unwrap()[0].role, ChatRole::Assistant);

        let system: std::result::Result<ChatRequest, _> = serde_json::from_str(
            r#"{"message":"hi","conversation_history":[{"role":"system","content":"x"}]}"#,
        );
        assert!(system.is_err());
    }

    #[test]
    fn test_blank_message_is_rejected() {
        let request = ChatRequest {
            message: "   ".to_string(),
            language: "en".to_string(),
            conversation_history: None,
        };
        assert!(request.validate().is_err());
    }
}
