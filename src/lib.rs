// ============================================================================
// OMNI Pass Library
// ============================================================================

//! Loyalty platform backend for tourists in South Korea: member accounts,
//! the OMNI Points ledger, partner stores, eco-missions, reviews, duty-free
//! reward tiers and a support chatbot, served over an axum HTTP API.
//!
//! # Examples
//!
//! ```no_run
//! use omnipass::{AppConfig, AppState, Database, build_router};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AppConfig::from_env()?;
//! let state = AppState::new(config, Database::in_memory())?;
//! let router = build_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod seed;
pub mod services;
pub mod state;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use app::build_router;
pub use config::AppConfig;
pub use error::{OmniError, Result};
pub use state::AppState;
pub use storage::{Database, DurabilityMode};
