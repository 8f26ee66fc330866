use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::models::store::{
    CreateStoreRequest, LocationQuery, NearbyQuery, StoreListQuery, StoreListResponse,
    StoreResponse,
};
use crate::services::stores;
use crate::state::AppState;
use crate::web::{self, AdminUser, ApiJson, ApiPath, ApiQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/nearby", get(nearby))
        .route("/:store_id", get(detail))
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StoreListQuery>,
) -> web::Result<Json<StoreListResponse>> {
    Ok(Json(stores::list(&state.db, &query)?))
}

async fn nearby(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NearbyQuery>,
) -> web::Result<Json<Vec<StoreResponse>>> {
    Ok(Json(stores::nearby(&state.db, &query)?))
}

async fn detail(
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> web::Result<Json<StoreResponse>> {
    Ok(Json(stores::get(&state.db, store_id, &query)?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiJson(request): ApiJson<CreateStoreRequest>,
) -> web::Result<(StatusCode, Json<StoreResponse>)> {
    let store = stores::create(&state.db, request)?;
    Ok((StatusCode::CREATED, Json(StoreResponse::new(&store, None))))
}
