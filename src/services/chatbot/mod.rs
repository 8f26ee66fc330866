//! Support assistant backed by a pluggable language model provider

mod claude;
mod gemini;
mod offline;
mod openai;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use offline::OfflineProvider;
pub use openai::OpenAiProvider;

use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{OmniError, Result};
use crate::models::ChatMessage;
use crate::models::chatbot::{ChatRequest, ChatResponse, TourismRequest};

const ANSWER_CACHE_CAPACITY: usize = 128;
const MAX_RETRIES: u32 = 2;
const MAX_TOKENS: u32 = 1024;

const SYSTEM_PROMPT: &str = "You are a helpful customer service assistant for OMNIPASS,
a points management platform for tourists in South Korea.

Your responsibilities:
- Answer questions about OMNI Points system
- Provide tourism information about South Korea
- Help with app navigation and features
- Recommend partner stores and cultural attractions
- Explain eco-missions

Always be friendly, helpful, and culturally sensitive.
Respond in the user's preferred language.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Claude,
    OpenAi,
    Gemini,
    Offline,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Self::Claude),
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "offline" => Ok(Self::Offline),
            other => Err(format!(
                "unknown chatbot provider '{other}' (expected claude, openai, gemini or offline)"
            )),
        }
    }
}

/// A model that answers a conversation under a system prompt
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the assistant's reply to the last message in `messages`.
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;
}

pub fn system_prompt(language: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nRespond in {language}.")
}

fn tourism_prompt(query: &str, language: &str) -> String {
    format!(
        "User query: {query}

Provide helpful tourism information about South Korea, including:
- Popular attractions
- Transportation tips
- Cultural etiquette
- Food recommendations
- Shopping locations

Response language: {language}"
    )
}

fn points_prompt(language: &str) -> String {
    format!(
        "Explain how the OMNI Points system works, including:
- How to earn points (purchases, missions, card charging)
- How to spend points (shopping, transport, culture)
- Partner stores
- Daily eco-missions

Response language: {language}"
    )
}

fn help_prompt(topic: Option<&str>) -> String {
    match topic.map(str::trim).filter(|topic| !topic.is_empty()) {
        Some(topic) => format!("Help me with: {topic}"),
        None => "What features does OMNIPASS offer?".to_string(),
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| OmniError::internal(format!("Failed to build HTTP client: {}", e)))
}

/// Runs `attempt` up to `MAX_RETRIES + 1` times with exponential backoff.
pub(crate) async fn with_retries<T, F, Fut>(provider: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if tries < MAX_RETRIES && matches!(err, OmniError::Upstream(_)) => {
                tries += 1;
                warn!(
                    provider,
                    attempt = tries,
                    max = MAX_RETRIES + 1,
                    error = %err,
                    "chat completion failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(tries - 1))).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Turns a non-success provider response into an `Upstream` error.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(OmniError::upstream(format!(
        "{provider} API error ({status}): {body}"
    )))
}

pub struct Chatbot {
    provider: Arc<dyn ChatProvider>,
    answers: Mutex<LruCache<(String, String), String>>,
}

impl Chatbot {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        let capacity = NonZeroUsize::new(ANSWER_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            answers: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineProvider))
    }

    /// Builds the provider named by `CHATBOT_PROVIDER`.
    ///
    /// A cloud provider without an API key degrades to the offline responder.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.chatbot_timeout;
        let key_for = |key: &str| (!key.trim().is_empty()).then(|| key.trim().to_string());

        let provider: Arc<dyn ChatProvider> = match config.chatbot_provider {
            ProviderKind::Claude => match key_for(&config.anthropic_api_key) {
                Some(key) => Arc::new(ClaudeProvider::new(key, timeout)?),
                None => Self::fallback(ProviderKind::Claude, "ANTHROPIC_API_KEY"),
            },
            ProviderKind::OpenAi => match key_for(&config.openai_api_key) {
                Some(key) => Arc::new(OpenAiProvider::new(key, timeout)?),
                None => Self::fallback(ProviderKind::OpenAi, "OPENAI_API_KEY"),
            },
            ProviderKind::Gemini => match key_for(&config.google_api_key) {
                Some(key) => Arc::new(GeminiProvider::new(key, timeout)?),
                None => Self::fallback(ProviderKind::Gemini, "GOOGLE_API_KEY"),
            },
            ProviderKind::Offline => Arc::new(OfflineProvider),
        };

        Ok(Self::new(provider))
    }

    fn fallback(kind: ProviderKind, variable: &str) -> Arc<dyn ChatProvider> {
        warn!(
            provider = %kind,
            variable,
            "chatbot API key missing, using offline responder"
        );
        Arc::new(OfflineProvider)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        request.validate()?;

        let mut history = request.conversation_history.unwrap_or_default();
        history.push(ChatMessage::user(request.message.trim()));

        let reply = self
            .provider
            .complete(&system_prompt(&request.language), &history)
            .await?;
        history.push(ChatMessage::assistant(reply.clone()));

        Ok(ChatResponse {
            response: reply,
            conversation_history: history,
        })
    }

    pub async fn tourism_info(&self, request: &TourismRequest) -> Result<String> {
        request.validate()?;
        self.ask(tourism_prompt(request.query.trim(), &request.language), &request.language)
            .await
    }

    pub async fn points_info(&self, language: &str) -> Result<String> {
        self.cached(points_prompt(language), language).await
    }

    pub async fn help(&self, topic: Option<&str>, language: &str) -> Result<String> {
        self.cached(help_prompt(topic), language).await
    }

    async fn ask(&self, prompt: String, language: &str) -> Result<String> {
        self.provider
            .complete(&system_prompt(language), &[ChatMessage::user(prompt)])
            .await
    }

    async fn cached(&self, prompt: String, language: &str) -> Result<String> {
        let key = (prompt, language.to_string());
        let hit = self.answers.lock()?.get(&key).cloned();
        if let Some(answer) = hit {
            debug!(language, "chatbot answer served from cache");
            return Ok(answer);
        }

        // The lock is not held across the provider call; concurrent misses
        // for one key may each ask the provider.
        let answer = self.ask(key.0.clone(), language).await?;
        self.answers.lock()?.put(key, answer.clone());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the last message and counts calls
    struct Recording {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatProvider for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            let language = system.rsplit("Respond in ").next().unwrap_or_default();
            Ok(format!("[{}] {}", language.trim_end_matches('.'), last))
        }
    }

    fn recording() -> (Arc<Recording>, Chatbot) {
        let provider = Arc::new(Recording {
            calls: AtomicUsize::new(0),
        });
        (provider.clone(), Chatbot::new(provider))
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Claude".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("openai".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert!("llama".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_missing_key_falls_back_to_offline() {
        let config = AppConfig::default().chatbot_provider(ProviderKind::OpenAi);
        let chatbot = Chatbot::from_config(&config).unwrap();
        assert_eq!(chatbot.provider_name(), "offline");
    }

    #[tokio::test]
    async fn test_chat_extends_history() {
        let (_, chatbot) = recording();
        let response = chatbot
            .chat(ChatRequest {
                message: "Where can I use points?".to_string(),
                language: "ko".to_string(),
                conversation_history: Some(vec![
                    ChatMessage::user("hello"),
                    ChatMessage::assistant("hi there"),
                ]),
            })
            .await
            .unwrap();

        assert_eq!(response.response, "[ko] Where can I use points?");
        assert_eq!(response.conversation_history.len(), 4);
        assert_eq!(
            response.conversation_history[3],
            ChatMessage::assistant("[ko] Where can I use points?")
        );
    }

    #[tokio::test]
    async fn test_info_answers_are_cached_per_language() {
        let (provider, chatbot) = recording();

        let first = chatbot.points_info("en").await.unwrap();
        let second = chatbot.points_info("en").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        chatbot.points_info("ja").await.unwrap();
        chatbot.help(Some("charging"), "en").await.unwrap();
        chatbot.help(Some("charging"), "en").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_only_upstream_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retries("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(OmniError::validation("bad"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_failures_retry_with_backoff() {
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();
        let result: Result<()> = with_retries("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(OmniError::upstream("503 from provider"))
        })
        .await;

        assert!(matches!(result, Err(OmniError::Upstream(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES as usize + 1);
        // 500 ms, then 1 s
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_transient_failure() {
        let calls = AtomicUsize::new(0);
        let result = with_retries("test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OmniError::upstream("connection reset"))
            } else {
                Ok("answer")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "answer");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
