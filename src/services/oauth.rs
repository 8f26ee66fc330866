//! Social login: exchanging a provider access token for a verified identity

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{OmniError, Result};
use crate::models::AuthProvider;

const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const FACEBOOK_ME_URL: &str = "https://graph.facebook.com/me";
const KAKAO_ME_URL: &str = "https://kapi.kakao.com/v2/user/me";

/// Profile returned by a provider for a valid access token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub email: Option<String>,
    pub name: String,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolves `access_token` to the provider's profile.
    ///
    /// Fails with `Unauthorized` when the provider rejects the token and with
    /// `Upstream` when the provider cannot be reached.
    async fn verify(&self, provider: AuthProvider, access_token: &str) -> Result<VerifiedIdentity>;
}

/// Calls the providers' profile endpoints over HTTPS
pub struct HttpIdentityVerifier {
    client: Client,
}

impl HttpIdentityVerifier {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OmniError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch(&self, provider: AuthProvider, access_token: &str) -> Result<Value> {
        let request = match provider {
            AuthProvider::Google => self.client.get(GOOGLE_USERINFO_URL).bearer_auth(access_token),
            AuthProvider::Facebook => self.client.get(FACEBOOK_ME_URL).query(&[
                ("fields", "id,name,email,picture"),
                ("access_token", access_token),
            ]),
            AuthProvider::Kakao => self.client.get(KAKAO_ME_URL).bearer_auth(access_token),
        };

        let response = request.send().await.map_err(|e| {
            warn!(provider = provider.display_name(), error = %e, "identity provider unreachable");
            OmniError::upstream(format!(
                "Failed to communicate with {}: {}",
                provider.display_name(),
                e
            ))
        })?;

        if response.status() != StatusCode::OK {
            debug!(
                provider = provider.display_name(),
                status = %response.status(),
                "access token rejected"
            );
            return Err(invalid_token(provider));
        }

        response.json::<Value>().await.map_err(|e| {
            OmniError::upstream(format!(
                "Failed to communicate with {}: {}",
                provider.display_name(),
                e
            ))
        })
    }
}

fn invalid_token(provider: AuthProvider) -> OmniError {
    OmniError::unauthorized(format!("Invalid {} access token", provider.display_name()))
}

fn text(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Maps a provider's profile document to a [`VerifiedIdentity`].
pub fn parse_profile(provider: AuthProvider, profile: &Value) -> VerifiedIdentity {
    let (provider_id, email, name, picture) = match provider {
        AuthProvider::Google => (
            text(profile, "/sub"),
            text(profile, "/email"),
            text(profile, "/name"),
            text(profile, "/picture"),
        ),
        AuthProvider::Facebook => (
            text(profile, "/id"),
            text(profile, "/email"),
            text(profile, "/name"),
            text(profile, "/picture/data/url"),
        ),
        AuthProvider::Kakao => (
            text(profile, "/id"),
            text(profile, "/kakao_account/email"),
            text(profile, "/kakao_account/profile/nickname"),
            text(profile, "/kakao_account/profile/profile_image_url"),
        ),
    };

    VerifiedIdentity {
        provider,
        provider_id,
        email,
        name: name.unwrap_or_default(),
        picture,
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, provider: AuthProvider, access_token: &str) -> Result<VerifiedIdentity> {
        if access_token.trim().is_empty() {
            return Err(invalid_token(provider));
        }
        let profile = self.fetch(provider, access_token).await?;
        Ok(parse_profile(provider, &profile))
    }
}
