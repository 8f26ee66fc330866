use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, MAX_TOKENS, check_status, http_client, with_retries};
use crate::error::{OmniError, Result};
use crate::models::{ChatMessage, ChatRole};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API
pub struct ClaudeProvider {
    api_key: String,
    client: Client,
}

impl ClaudeProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            client: http_client(timeout)?,
        })
    }

    async fn try_complete(&self, request: &MessagesRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let body: MessagesResponse = check_status("Claude", response).await?.json().await?;
        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(OmniError::upstream("Claude returned an empty response"));
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|message| WireMessage {
            role: match message.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: &message.content,
        })
        .collect()
}

#[async_trait]
impl ChatProvider for ClaudeProvider {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: wire_messages(messages),
        };
        with_retries(self.name(), || self.try_complete(&request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let messages = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: "be brief",
            messages: wire_messages(&messages),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "be brief");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["max_tokens"], 1024);
    }
}
