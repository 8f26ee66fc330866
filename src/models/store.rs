use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{default_page, ensure_length};
use crate::error::{OmniError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCategory {
    DutyFree,
    Restaurant,
    Retail,
    Transport,
    Culture,
}

/// Partner store where points are earned and spent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerStore {
    pub id: Uuid,
    pub name: String,
    pub category: StoreCategory,
    pub description: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Points per 1000 KRW spent
    pub point_rate: f64,
    pub images: Vec<String>,
    pub opening_hours: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    pub id: Uuid,
    pub name: String,
    pub category: StoreCategory,
    pub description: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub point_rate: f64,
    pub images: Vec<String>,
    pub opening_hours: Option<String>,
    pub contact: Option<String>,
    /// Kilometres from the caller, when a location was supplied
    pub distance: Option<f64>,
}

impl StoreResponse {
    pub fn new(store: &PartnerStore, distance: Option<f64>) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            category: store.category,
            description: store.description.clone(),
            address: store.address.clone(),
            latitude: store.latitude,
            longitude: store.longitude,
            point_rate: store.point_rate,
            images: store.images.clone(),
            opening_hours: store.opening_hours.clone(),
            contact: store.contact.clone(),
            distance: distance.map(|km| (km * 100.0).round() / 100.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub stores: Vec<StoreResponse>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreListQuery {
    pub category: Option<StoreCategory>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_list_radius")]
    pub radius: f64,
    #[serde(default = "default_page")]
    pub page: u32,
    pub page_size: Option<u32>,
}

fn default_list_radius() -> f64 {
    50.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_nearby_radius")]
    pub radius: f64,
    pub category: Option<StoreCategory>,
    #[serde(default = "default_nearby_limit")]
    pub limit: usize,
}

fn default_nearby_radius() -> f64 {
    5.0
}

fn default_nearby_limit() -> usize {
    10
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub category: StoreCategory,
    pub description: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub point_rate: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub opening_hours: Option<String>,
    pub contact: Option<String>,
}

impl CreateStoreRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_length("name", &self.name, 1, 200)?;
        ensure_length("address", &self.address, 1, 500)?;
        ensure_coordinates(self.latitude, self.longitude)?;
        if let Some(rate) = self.point_rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err(OmniError::validation(
                    "point_rate must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

pub fn ensure_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(OmniError::validation("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(OmniError::validation(
            "longitude must be between -180 and 180",
        ));
    }
    Ok(())
}
