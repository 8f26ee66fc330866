use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::chatbot::ProviderKind;
use crate::storage::DurabilityMode;

pub const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

/// Service configuration
///
/// Read from the process environment (and a `.env` file when present).
/// Tests build it with `AppConfig::default()` and the setters below.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// HMAC secret for access tokens
    pub secret_key: String,

    /// Access token lifetime
    pub access_token_ttl: Duration,

    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,

    /// `None` allows any origin
    pub allowed_origins: Option<Vec<String>>,

    /// Directory for WAL and snapshot; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    pub durability: DurabilityMode,
    pub checkpoint_threshold: usize,

    pub chatbot_provider: ProviderKind,
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub google_api_key: String,
    pub chatbot_timeout: Duration,

    /// Accounts granted the admin role on registration or login
    pub admin_emails: Vec<String>,

    pub seed_catalog: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            access_token_ttl: Duration::from_secs(30 * 60),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            allowed_origins: None,
            data_dir: None,
            durability: DurabilityMode::default(),
            checkpoint_threshold: 1000,
            chatbot_provider: ProviderKind::Claude,
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
            google_api_key: String::new(),
            chatbot_timeout: Duration::from_secs(30),
            admin_emails: Vec::new(),
            seed_catalog: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let host = env::var("APP_HOST").unwrap_or(defaults.host);
        let port = parse_var("APP_PORT", defaults.port)?;
        let secret_key = env::var("SECRET_KEY").unwrap_or(defaults.secret_key);

        let expire_minutes: u64 = parse_var("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        if expire_minutes == 0 {
            anyhow::bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be greater than zero");
        }

        let bcrypt_cost: u32 = parse_var("BCRYPT_COST", defaults.bcrypt_cost)?;
        if !(4..=31).contains(&bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31");
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .ok()
            .and_then(|raw| parse_origins(&raw));

        let data_dir = env::var("DATA_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let durability = match env::var("DURABILITY") {
            Ok(raw) => raw
                .parse::<DurabilityMode>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("DURABILITY must be one of: sync, async, none")?,
            Err(_) => defaults.durability,
        };

        let checkpoint_threshold = parse_var("CHECKPOINT_THRESHOLD", defaults.checkpoint_threshold)?;

        let chatbot_provider = match env::var("CHATBOT_PROVIDER") {
            Ok(raw) => raw
                .parse::<ProviderKind>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("CHATBOT_PROVIDER must be one of: claude, openai, gemini, offline")?,
            Err(_) => defaults.chatbot_provider,
        };

        let chatbot_timeout_secs: u64 = parse_var("CHATBOT_TIMEOUT_SECS", 30)?;

        let admin_emails = env::var("ADMIN_EMAILS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        let seed_catalog = parse_bool_var("SEED_CATALOG", defaults.seed_catalog)?;

        Ok(Self {
            host,
            port,
            secret_key,
            access_token_ttl: Duration::from_secs(expire_minutes * 60),
            bcrypt_cost,
            allowed_origins,
            data_dir,
            durability,
            checkpoint_threshold,
            chatbot_provider,
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            google_api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
            chatbot_timeout: Duration::from_secs(chatbot_timeout_secs),
            admin_emails,
            seed_catalog,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    /// Set the listen port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the token signing secret
    pub fn secret_key(mut self, secret: &str) -> Self {
        self.secret_key = secret.to_string();
        self
    }

    /// Set access token lifetime
    pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Enable persistence in `dir`
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    pub fn checkpoint_threshold(mut self, threshold: usize) -> Self {
        self.checkpoint_threshold = threshold;
        self
    }

    pub fn chatbot_provider(mut self, provider: ProviderKind) -> Self {
        self.chatbot_provider = provider;
        self
    }

    pub fn admin_email(mut self, email: &str) -> Self {
        self.admin_emails.push(email.to_string());
        self
    }

    pub fn seed_catalog(mut self, seed: bool) -> Self {
        self.seed_catalog = seed;
        self
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_bool_var(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow::anyhow!("{name} must be a boolean, got {raw}")),
        },
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins = parse_list(raw);
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        None
    } else {
        Some(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_setters() {
        let config = AppConfig::default()
            .port(9000)
            .secret_key("s3cret")
            .admin_email("Ops@Omnipass.kr")
            .seed_catalog(false);

        assert_eq!(config.address(), "0.0.0.0:9000");
        assert!(!config.uses_default_secret());
        assert!(config.is_admin_email("ops@omnipass.kr"));
        assert!(!config.seed_catalog);
    }

    #[test]
    fn test_origins_wildcard_means_any() {
        assert_eq!(parse_origins("*"), None);
        assert_eq!(parse_origins(" , "), None);
        assert_eq!(
            parse_origins("http://localhost:3000, https://omnipass.kr"),
            Some(vec![
                "http://localhost:3000".to_string(),
                "https://omnipass.kr".to_string()
            ])
        );
    }
}
