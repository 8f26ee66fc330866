use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::chatbot::{
    AnswerResponse, ChatRequest, ChatResponse, HelpQuery, LanguageQuery, TourismRequest,
};
use crate::state::AppState;
use crate::web::{self, ApiJson, ApiQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/tourism-info", post(tourism_info))
        .route("/points-info", get(points_info))
        .route("/help", get(help))
}

async fn chat(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> web::Result<Json<ChatResponse>> {
    Ok(Json(state.chatbot.chat(request).await?))
}

async fn tourism_info(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TourismRequest>,
) -> web::Result<Json<AnswerResponse>> {
    let response = state.chatbot.tourism_info(&request).await?;
    Ok(Json(AnswerResponse { response }))
}

async fn points_info(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LanguageQuery>,
) -> web::Result<Json<AnswerResponse>> {
    let response = state.chatbot.points_info(&query.language).await?;
    Ok(Json(AnswerResponse { response }))
}

async fn help(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HelpQuery>,
) -> web::Result<Json<AnswerResponse>> {
    let response = state
        .chatbot
        .help(query.topic.as_deref(), &query.language)
        .await?;
    Ok(Json(AnswerResponse { response }))
}
