use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OmniError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionType {
    Daily,
    Weekly,
    Special,
}

/// Eco-mission template members can start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub points: i64,
    #[serde(rename = "type")]
    pub kind: MissionType,
    pub requirements: Vec<String>,
    pub max_progress: u32,
    /// Completion goes through photo proof and an admin review
    pub requires_photo: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Mission {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMissionStatus {
    Active,
    PendingReview,
    Completed,
    Rejected,
    Expired,
}

impl UserMissionStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Rejected)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionPhoto {
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
}

/// A member's run of a mission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mission_id: Uuid,
    pub status: UserMissionStatus,
    pub progress: u32,
    pub photo: Option<MissionPhoto>,
    pub rejection_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MissionQuery {
    #[serde(rename = "type")]
    pub kind: Option<MissionType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressRequest {
    pub increment: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSubmission {
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PhotoSubmission {
    pub fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(OmniError::validation("photo url must not be blank"));
        }
        if url.len() > 2048 {
            return Err(OmniError::validation(
                "photo url must be at most 2048 characters",
            ));
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => super::store::ensure_coordinates(lat, lon),
            (None, None) => Ok(()),
            _ => Err(OmniError::validation(
                "latitude and longitude must be provided together",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDecision {
    pub approve: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMissionRequest {
    pub title: String,
    pub description: String,
    pub points: i64,
    #[serde(rename = "type")]
    pub kind: MissionType,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub max_progress: Option<u32>,
    #[serde(default)]
    pub requires_photo: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateMissionRequest {
    pub fn validate(&self) -> Result<()> {
        super::common::ensure_length("title", &self.title, 1, 200)?;
        super::common::ensure_length("description", &self.description, 1, 2000)?;
        if self.points <= 0 {
            return Err(OmniError::validation("points must be positive"));
        }
        if self.max_progress == Some(0) {
            return Err(OmniError::validation("max_progress must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserMissionResponse {
    pub id: Uuid,
    pub mission: Mission,
    pub status: UserMissionStatus,
    pub progress: u32,
    pub max_progress: u32,
    pub progress_percentage: u32,
    pub photo: Option<MissionPhoto>,
    pub rejection_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

impl UserMissionResponse {
    pub fn new(user_mission: &UserMission, mission: &Mission, now: DateTime<Utc>) -> Self {
        let status = if user_mission.status.is_open() && mission.is_expired(now) {
            UserMissionStatus::Expired
        } else {
            user_mission.status
        };

        Self {
            id: user_mission.id,
            mission: mission.clone(),
            status,
            progress: user_mission.progress,
            max_progress: mission.max_progress,
            progress_percentage: progress_percentage(user_mission.progress, mission.max_progress),
            photo: user_mission.photo.clone(),
            rejection_reason: user_mission.rejection_reason.clone(),
            completed_at: user_mission.completed_at,
            started_at: user_mission.created_at,
        }
    }
}

pub fn progress_percentage(progress: u32, max_progress: u32) -> u32 {
    if max_progress == 0 {
        return 0;
    }
    ((progress as f64 / max_progress as f64) * 100.0).round() as u32
}
