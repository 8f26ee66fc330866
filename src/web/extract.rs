use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;

use super::WebError;
use crate::error::OmniError;
use crate::models::User;
use crate::state::AppState;

/// `Json` whose rejection renders as an API error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(WebError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection renders as an API error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(WebError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection renders as an API error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(WebError))]
pub struct ApiPath<T>(pub T);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

fn resolve_user(state: &AppState, token: &str) -> crate::Result<User> {
    let user_id = state.tokens.verify(token)?;
    state
        .db
        .read(|tables| tables.user(user_id).cloned())?
        .ok_or_else(|| OmniError::unauthorized("Could not validate credentials"))
}

/// Caller authenticated with a bearer token
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| OmniError::unauthorized("Not authenticated"))?;
        Ok(AuthUser(resolve_user(state, token)?))
    }
}

/// Caller if a valid bearer token was sent; anything else is anonymous
pub struct OptionalAuthUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = bearer_token(parts).and_then(|token| resolve_user(state, token).ok());
        Ok(OptionalAuthUser(user))
    }
}

/// Authenticated caller holding the admin role
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(OmniError::forbidden("Admin privileges required").into());
        }
        Ok(AdminUser(user))
    }
}
