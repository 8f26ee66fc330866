use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, MAX_TOKENS, check_status, http_client, with_retries};
use crate::error::{OmniError, Result};
use crate::models::{ChatMessage, ChatRole};

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Google Gemini `generateContent` API
pub struct GeminiProvider {
    api_key: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            client: http_client(timeout)?,
        })
    }

    async fn try_complete(&self, request: &GenerateRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(GENERATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let body: GenerateResponse = check_status("Gemini", response).await?.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(OmniError::upstream("Gemini returned an empty response"));
        }
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn build_request<'a>(system: &'a str, messages: &'a [ChatMessage]) -> GenerateRequest<'a> {
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part { text: system }],
        },
        contents: messages
            .iter()
            .map(|message| Content {
                // Gemini calls the assistant side "model"
                role: Some(match message.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                }),
                parts: vec![Part {
                    text: &message.content,
                }],
            })
            .collect(),
        generation_config: GenerationConfig {
            max_output_tokens: MAX_TOKENS,
        },
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let request = build_request(system, messages);
        with_retries(self.name(), || self.try_complete(&request)).await
    }
}
