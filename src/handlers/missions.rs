use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::models::Mission;
use crate::models::mission::{
    CreateMissionRequest, MissionQuery, PhotoSubmission, ProgressRequest, ReviewDecision,
    UserMissionResponse,
};
use crate::services::missions;
use crate::state::AppState;
use crate::web::{self, AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(available).post(create))
        .route("/my", get(my_missions))
        .route("/reviews/:user_mission_id", post(review_photo))
        .route("/:mission_id/start", post(start))
        .route("/:mission_id/progress", get(progress).post(record_progress))
        .route("/:mission_id/photo", post(submit_photo))
        .route("/:mission_id/complete", post(complete))
}

async fn available(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MissionQuery>,
) -> web::Result<Json<Vec<Mission>>> {
    Ok(Json(missions::available(&state.db, query.kind)?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiJson(request): ApiJson<CreateMissionRequest>,
) -> web::Result<(StatusCode, Json<Mission>)> {
    let mission = missions::create(&state.db, request)?;
    Ok((StatusCode::CREATED, Json(mission)))
}

async fn my_missions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> web::Result<Json<Vec<UserMissionResponse>>> {
    Ok(Json(missions::my_missions(&state.db, user.id)?))
}

async fn start(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(mission_id): ApiPath<Uuid>,
) -> web::Result<(StatusCode, Json<UserMissionResponse>)> {
    let run = missions::start(&state.db, user.id, mission_id)?;
    Ok((StatusCode::CREATED, Json(run)))
}

async fn progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(mission_id): ApiPath<Uuid>,
) -> web::Result<Json<UserMissionResponse>> {
    Ok(Json(missions::progress_of(&state.db, user.id, mission_id)?))
}

async fn record_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(mission_id): ApiPath<Uuid>,
    body: Option<ApiJson<ProgressRequest>>,
) -> web::Result<Json<UserMissionResponse>> {
    let increment = body
        .and_then(|ApiJson(request)| request.increment)
        .unwrap_or(1);
    Ok(Json(missions::record_progress(
        &state.db, user.id, mission_id, increment,
    )?))
}

async fn submit_photo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(mission_id): ApiPath<Uuid>,
    ApiJson(submission): ApiJson<PhotoSubmission>,
) -> web::Result<Json<UserMissionResponse>> {
    Ok(Json(missions::submit_photo(
        &state.db, user.id, mission_id, submission,
    )?))
}

async fn complete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(mission_id): ApiPath<Uuid>,
) -> web::Result<Json<UserMissionResponse>> {
    Ok(Json(missions::complete(&state.db, user.id, mission_id)?))
}

async fn review_photo(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(user_mission_id): ApiPath<Uuid>,
    ApiJson(decision): ApiJson<ReviewDecision>,
) -> web::Result<Json<UserMissionResponse>> {
    Ok(Json(missions::review_photo(
        &state.db,
        user_mission_id,
        decision,
    )?))
}
