use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::AccessToken;
use crate::models::user::{LoginRequest, LogoutResponse, RegisterRequest, UserResponse};
use crate::services::accounts;
use crate::state::AppState;
use crate::web::{self, ApiJson, AuthUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> web::Result<(StatusCode, Json<UserResponse>)> {
    let user = accounts::register(&state.db, &state.config, request).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> web::Result<Json<AccessToken>> {
    let user = accounts::login(&state.db, &state.config, request).await?;
    Ok(Json(state.tokens.issue(user.id)?))
}

async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// Tokens are stateless; the client discards its copy
async fn logout(AuthUser(user): AuthUser) -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "Successfully logged out".to_string(),
        user_id: user.id,
    })
}
