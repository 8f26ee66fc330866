use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, MAX_TOKENS, check_status, http_client, with_retries};
use crate::error::{OmniError, Result};
use crate::models::{ChatMessage, ChatRole};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.7;

/// OpenAI Chat Completions API
pub struct OpenAiProvider {
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            client: http_client(timeout)?,
        })
    }

    async fn try_complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let body: CompletionResponse = check_status("OpenAI", response).await?.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| OmniError::upstream("OpenAI returned an empty response"))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// The system prompt travels as the first message
fn wire_messages<'a>(system: &'a str, messages: &'a [ChatMessage]) -> Vec<WireMessage<'a>> {
    std::iter::once(WireMessage {
        role: "system",
        content: system,
    })
    .chain(messages.iter().map(|message| WireMessage {
        role: match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        },
        content: &message.content,
    }))
    .collect()
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: MODEL,
            messages: wire_messages(system, messages),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };
        with_retries(self.name(), || self.try_complete(&request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_leads() {
        let messages = vec![ChatMessage::user("안녕하세요")];
        let wire = wire_messages("system text", &messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].content, "안녕하세요");
    }
}
