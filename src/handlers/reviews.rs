use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::models::MessageResponse;
use crate::models::review::{
    ReplyCreate, ReplyResponse, ReplyUpdate, ReviewCreate, ReviewListQuery, ReviewListResponse,
    ReviewResponse, ReviewUpdate, ReviewWithRepliesResponse,
};
use crate::services::reviews;
use crate::state::AppState;
use crate::web::{self, ApiJson, ApiPath, ApiQuery, AuthUser, OptionalAuthUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/replies/:reply_id", put(update_reply).delete(delete_reply))
        .route("/:review_id", get(detail).put(update).delete(delete))
        .route(
            "/:review_id/helpful",
            post(mark_helpful).delete(unmark_helpful),
        )
        .route("/:review_id/replies", get(replies).post(create_reply))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<ReviewCreate>,
) -> web::Result<(StatusCode, Json<ReviewResponse>)> {
    let review = reviews::create(&state.db, user.id, request)?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn list(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    ApiQuery(query): ApiQuery<ReviewListQuery>,
) -> web::Result<Json<ReviewListResponse>> {
    let viewer = viewer.map(|user| user.id);
    Ok(Json(reviews::list(&state.db, &query, viewer)?))
}

async fn detail(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    ApiPath(review_id): ApiPath<Uuid>,
) -> web::Result<Json<ReviewWithRepliesResponse>> {
    let viewer = viewer.map(|user| user.id);
    Ok(Json(reviews::get(&state.db, review_id, viewer)?))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReviewUpdate>,
) -> web::Result<Json<ReviewResponse>> {
    Ok(Json(reviews::update(&state.db, user.id, review_id, request)?))
}

async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<Uuid>,
) -> web::Result<StatusCode> {
    reviews::delete(&state.db, user.id, review_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_helpful(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<Uuid>,
) -> web::Result<(StatusCode, Json<MessageResponse>)> {
    reviews::mark_helpful(&state.db, user.id, review_id)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Review marked as helpful")),
    ))
}

async fn unmark_helpful(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<Uuid>,
) -> web::Result<StatusCode> {
    reviews::unmark_helpful(&state.db, user.id, review_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_reply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReplyCreate>,
) -> web::Result<(StatusCode, Json<ReplyResponse>)> {
    let reply = reviews::create_reply(&state.db, user.id, review_id, request)?;
    Ok((StatusCode::CREATED, Json(reply)))
}

async fn replies(
    State(state): State<AppState>,
    ApiPath(review_id): ApiPath<Uuid>,
) -> web::Result<Json<Vec<ReplyResponse>>> {
    Ok(Json(reviews::replies(&state.db, review_id)?))
}

async fn update_reply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(reply_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReplyUpdate>,
) -> web::Result<Json<ReplyResponse>> {
    Ok(Json(reviews::update_reply(&state.db, user.id, reply_id, request)?))
}

async fn delete_reply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(reply_id): ApiPath<Uuid>,
) -> web::Result<StatusCode> {
    reviews::delete_reply(&state.db, user.id, reply_id)?;
    Ok(StatusCode::NO_CONTENT)
}
