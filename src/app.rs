use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;

/// Assembles the full HTTP API.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.allowed_origins.as_deref());

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/auth", handlers::auth::routes())
        .nest("/api/oauth", handlers::oauth::routes())
        .nest("/api/users", handlers::users::routes())
        .nest("/api/points", handlers::points::routes())
        .nest("/api/stores", handlers::stores::routes())
        .nest("/api/missions", handlers::missions::routes())
        .nest("/api/reviews", handlers::reviews::routes())
        .nest("/api/rewards", handlers::rewards::routes())
        .nest("/api/chatbot", handlers::chatbot::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `None` allows any origin without credentials; a list allows exactly those
/// origins with credentials.
fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins else {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
