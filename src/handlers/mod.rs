//! axum handlers, one module per API router

pub mod auth;
pub mod chatbot;
pub mod missions;
pub mod oauth;
pub mod points;
pub mod reviews;
pub mod rewards;
pub mod stores;
pub mod users;

use axum::Json;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to OMNIPASS API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/docs",
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
