use std::cmp::Ordering;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{OmniError, Result};
use crate::models::store::{
    CreateStoreRequest, LocationQuery, NearbyQuery, StoreListQuery, StoreListResponse,
    StoreResponse, ensure_coordinates,
};
use crate::models::{PageParams, PartnerStore, StoreCategory};
use crate::storage::Database;

const EARTH_RADIUS_KM: f64 = 6371.0;
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
const MAX_NEARBY_LIMIT: usize = 50;

/// Great-circle distance in kilometres (haversine)
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<(f64, f64)>> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => {
            ensure_coordinates(lat, lon)?;
            Ok(Some((lat, lon)))
        }
        (None, None) => Ok(None),
        _ => Err(OmniError::validation(
            "latitude and longitude must be provided together",
        )),
    }
}

fn ensure_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(OmniError::validation("radius must be a non-negative number"))
    }
}

/// Stores in `category` within `radius` km of `origin`, nearest first
fn within_radius(
    db: &Database,
    category: Option<StoreCategory>,
    origin: (f64, f64),
    radius: f64,
) -> Result<Vec<(PartnerStore, f64)>> {
    let mut found: Vec<(PartnerStore, f64)> = db.read(|tables| {
        tables
            .stores
            .values()
            .filter(|store| category.is_none_or(|c| store.category == c))
            .map(|store| {
                let distance = distance_km(origin.0, origin.1, store.latitude, store.longitude);
                (store.clone(), distance)
            })
            .filter(|(_, distance)| *distance <= radius)
            .collect()
    })?;
    found.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    Ok(found)
}

pub fn list(db: &Database, query: &StoreListQuery) -> Result<StoreListResponse> {
    let page = PageParams {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let origin = location(query.latitude, query.longitude)?;

    let stores: Vec<(PartnerStore, Option<f64>)> = match origin {
        Some(origin) => {
            ensure_radius(query.radius)?;
            within_radius(db, query.category, origin, query.radius)?
                .into_iter()
                .map(|(store, distance)| (store, Some(distance)))
                .collect()
        }
        None => {
            let mut stores: Vec<PartnerStore> = db.read(|tables| {
                tables
                    .stores
                    .values()
                    .filter(|store| query.category.is_none_or(|c| store.category == c))
                    .cloned()
                    .collect()
            })?;
            stores.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            stores.into_iter().map(|store| (store, None)).collect()
        }
    };

    let total = stores.len();
    let stores = page
        .slice(stores)
        .iter()
        .map(|(store, distance)| StoreResponse::new(store, *distance))
        .collect();

    Ok(StoreListResponse {
        stores,
        total,
        page: page.page,
        page_size: page.page_size,
    })
}

pub fn nearby(db: &Database, query: &NearbyQuery) -> Result<Vec<StoreResponse>> {
    ensure_coordinates(query.latitude, query.longitude)?;
    ensure_radius(query.radius)?;
    if query.limit < 1 || query.limit > MAX_NEARBY_LIMIT {
        return Err(OmniError::validation(format!(
            "limit must be between 1 and {MAX_NEARBY_LIMIT}"
        )));
    }

    let found = within_radius(
        db,
        query.category,
        (query.latitude, query.longitude),
        query.radius,
    )?;
    Ok(found
        .iter()
        .take(query.limit)
        .map(|(store, distance)| StoreResponse::new(store, Some(*distance)))
        .collect())
}

pub fn get(db: &Database, store_id: Uuid, query: &LocationQuery) -> Result<StoreResponse> {
    let origin = location(query.latitude, query.longitude)?;
    let store = db
        .read(|tables| tables.stores.get(&store_id).cloned())?
        .ok_or_else(|| OmniError::not_found("Store not found"))?;

    let distance =
        origin.map(|(lat, lon)| distance_km(lat, lon, store.latitude, store.longitude));
    Ok(StoreResponse::new(&store, distance))
}

pub fn create(db: &Database, request: CreateStoreRequest) -> Result<PartnerStore> {
    request.validate()?;

    let store = PartnerStore {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        category: request.category,
        description: request.description,
        address: request.address.trim().to_string(),
        latitude: request.latitude,
        longitude: request.longitude,
        point_rate: request.point_rate.unwrap_or(1.0),
        images: request.images,
        opening_hours: request.opening_hours,
        contact: request.contact,
        created_at: Utc::now(),
    };

    db.transact(|tx| {
        tx.put(store.clone());
        Ok(())
    })?;
    info!(store_id = %store.id, name = %store.name, "partner store created");
    Ok(store)
}
