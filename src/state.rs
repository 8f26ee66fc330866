use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::services::chatbot::Chatbot;
use crate::services::oauth::{HttpIdentityVerifier, IdentityVerifier};
use crate::storage::Database;

/// Handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub chatbot: Arc<Chatbot>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the production collaborators from `config`.
    pub fn new(config: AppConfig, db: Database) -> crate::Result<Self> {
        let chatbot = Chatbot::from_config(&config)?;
        let identity = HttpIdentityVerifier::new(config.chatbot_timeout)?;
        Ok(Self::with_parts(config, db, chatbot, Arc::new(identity)))
    }

    /// Same as [`AppState::new`] with injected chatbot and identity verifier.
    pub fn with_parts(
        config: AppConfig,
        db: Database,
        chatbot: Chatbot,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let tokens = TokenService::new(&config.secret_key, config.access_token_ttl);
        Self {
            db: Arc::new(db),
            tokens: Arc::new(tokens),
            chatbot: Arc::new(chatbot),
            identity,
            config: Arc::new(config),
        }
    }
}
