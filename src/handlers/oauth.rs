use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::AccessToken;
use crate::models::AuthProvider;
use crate::services::accounts;
use crate::state::AppState;
use crate::web::{self, ApiJson, ApiPath};

#[derive(Debug, Deserialize)]
pub struct SocialLoginRequest {
    pub access_token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/:provider", post(social_login))
}

async fn social_login(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiJson(request): ApiJson<SocialLoginRequest>,
) -> web::Result<Json<AccessToken>> {
    let provider: AuthProvider = provider.parse()?;
    let identity = state
        .identity
        .verify(provider, request.access_token.trim())
        .await?;
    let user = accounts::login_with_identity(&state.db, &state.config, identity)?;
    Ok(Json(state.tokens.issue(user.id)?))
}
