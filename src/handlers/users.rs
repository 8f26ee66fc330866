use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::models::user::{
    LanguageUpdateRequest, MemberCodeResponse, MemberLookupResponse, ProfileUpdateRequest,
    UserProfileResponse,
};
use crate::services::accounts;
use crate::state::AppState;
use crate::web::{self, AdminUser, ApiJson, ApiPath, AuthUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(profile).put(update_profile))
        .route("/me/language", put(update_language))
        .route("/me/code", get(member_code))
        .route("/by-code/:customer_id", get(lookup_member))
}

async fn profile(AuthUser(user): AuthUser) -> Json<UserProfileResponse> {
    Json(UserProfileResponse::from(&user))
}

async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(update): ApiJson<ProfileUpdateRequest>,
) -> web::Result<Json<UserProfileResponse>> {
    let user = accounts::update_profile(&state.db, user.id, update)?;
    Ok(Json(UserProfileResponse::from(&user)))
}

async fn update_language(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<LanguageUpdateRequest>,
) -> web::Result<Json<UserProfileResponse>> {
    let user = accounts::update_language(&state.db, user.id, &request)?;
    Ok(Json(UserProfileResponse::from(&user)))
}

async fn member_code(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> web::Result<Json<MemberCodeResponse>> {
    Ok(Json(accounts::member_code(&state.db, &user)?))
}

async fn lookup_member(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(customer_id): ApiPath<String>,
) -> web::Result<Json<MemberLookupResponse>> {
    Ok(Json(accounts::lookup_member(&state.db, &customer_id)?))
}
