use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::reward::{
    ClaimRequest, REWARD_OPTIONS, REWARD_TIERS, ReceiptRequest, RewardOption, RewardSummary,
    TierDefinition,
};
use crate::models::{DutyFreeReceipt, RewardClaim};
use crate::services::rewards;
use crate::state::AppState;
use crate::web::{self, ApiJson, AuthUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tiers", get(tiers))
        .route("/options", get(options))
        .route("/summary", get(summary))
        .route("/receipts", post(record_receipt))
        .route("/claim", post(claim))
}

async fn tiers() -> Json<&'static [TierDefinition]> {
    let tiers: &'static [TierDefinition] = &REWARD_TIERS;
    Json(tiers)
}

async fn options() -> Json<&'static [RewardOption]> {
    let options: &'static [RewardOption] = &REWARD_OPTIONS;
    Json(options)
}

async fn summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> web::Result<Json<RewardSummary>> {
    Ok(Json(rewards::summary(&state.db, user.id)?))
}

async fn record_receipt(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<ReceiptRequest>,
) -> web::Result<(StatusCode, Json<DutyFreeReceipt>)> {
    let receipt = rewards::record_receipt(&state.db, user.id, request)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn claim(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<ClaimRequest>,
) -> web::Result<(StatusCode, Json<RewardClaim>)> {
    let claim = rewards::claim(&state.db, user.id, &request)?;
    Ok((StatusCode::CREATED, Json(claim)))
}
