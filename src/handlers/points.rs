use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::points::{
    ChargeOptions, ChargeRequest, EarnRequest, SpendRequest, TransactionPage, TransactionQuery,
};
use crate::models::{PointBalance, PointTransaction};
use crate::services::points;
use crate::state::AppState;
use crate::web::{self, ApiJson, ApiQuery, AuthUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/balance", get(balance))
        .route("/transactions", get(transactions))
        .route("/charge-options", get(charge_options))
        .route("/charge", post(charge))
        .route("/earn", post(earn))
        .route("/spend", post(spend))
}

async fn balance(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> web::Result<Json<PointBalance>> {
    Ok(Json(points::balance(&state.db, user.id)?))
}

async fn transactions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> web::Result<Json<TransactionPage>> {
    Ok(Json(points::transactions(&state.db, user.id, &query)?))
}

async fn charge_options() -> Json<ChargeOptions> {
    Json(ChargeOptions::default())
}

async fn charge(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<ChargeRequest>,
) -> web::Result<(StatusCode, Json<PointTransaction>)> {
    let transaction = points::charge(&state.db, user.id, &request)?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn earn(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<EarnRequest>,
) -> web::Result<(StatusCode, Json<PointTransaction>)> {
    let transaction = points::earn(&state.db, user.id, &request)?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn spend(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<SpendRequest>,
) -> web::Result<(StatusCode, Json<PointTransaction>)> {
    let transaction = points::spend(&state.db, user.id, &request)?;
    Ok((StatusCode::CREATED, Json(transaction)))
}
