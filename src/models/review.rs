use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{default_page, ensure_length};
use super::user::UserSummary;
use crate::error::{OmniError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    MedicalFacility,
    SdmPackage,
    Store,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReply {
    pub id: Uuid,
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub parent_reply_id: Option<Uuid>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One member's "helpful" vote on a review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpfulMark {
    pub id: Uuid,
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

fn ensure_rating(rating: u8) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(OmniError::validation("rating must be between 1 and 5"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewCreate {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub rating: u8,
    pub comment: String,
}

impl ReviewCreate {
    pub fn validate(&self) -> Result<()> {
        ensure_length("entity_id", &self.entity_id, 1, 255)?;
        ensure_rating(self.rating)?;
        ensure_length("comment", &self.comment, 1, 5000)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(rating) = self.rating {
            ensure_rating(rating)?;
        }
        if let Some(comment) = self.comment.as_deref() {
            ensure_length("comment", comment, 1, 5000)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Recent,
    Helpful,
    RatingHigh,
    RatingLow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewListQuery {
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(default = "default_page")]
    pub page: u32,
    pub page_size: Option<u32>,
    #[serde(default)]
    pub sort_by: ReviewSort,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user: UserSummary,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub rating: u8,
    pub comment: String,
    pub helpful_count: usize,
    pub user_has_marked_helpful: bool,
    pub reply_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<ReviewResponse>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub average_rating: f64,
    /// Keys "1" through "5"
    pub rating_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyCreate {
    pub comment: String,
    pub parent_reply_id: Option<Uuid>,
}

impl ReplyCreate {
    pub fn validate(&self) -> Result<()> {
        ensure_length("comment", &self.comment, 1, 2000)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyUpdate {
    pub comment: String,
}

impl ReplyUpdate {
    pub fn validate(&self) -> Result<()> {
        ensure_length("comment", &self.comment, 1, 2000)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyResponse {
    pub id: Uuid,
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub user: UserSummary,
    pub parent_reply_id: Option<Uuid>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub child_replies: Vec<ReplyResponse>,
}

#[derive(Debug, Serialize)]
pub struct ReviewWithRepliesResponse {
    #[serde(flatten)]
    pub review: ReviewResponse,
    pub replies: Vec<ReplyResponse>,
}
