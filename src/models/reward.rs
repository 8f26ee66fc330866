use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::ensure_length;
use crate::error::{OmniError, Result};

/// Duty-free purchase tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardTier {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TierDefinition {
    pub tier: RewardTier,
    pub badge: &'static str,
    /// Purchase total (KRW) that unlocks the tier
    pub min_amount: i64,
    /// Gift card / ticket value (KRW)
    pub reward: i64,
}

/// Largest single receipt accepted, in KRW
pub const MAX_RECEIPT_AMOUNT: i64 = 10_000_000_000;

/// Ascending by threshold
pub const REWARD_TIERS: [TierDefinition; 3] = [
    TierDefinition {
        tier: RewardTier::Bronze,
        badge: "Bronze",
        min_amount: 300_000,
        reward: 30_000,
    },
    TierDefinition {
        tier: RewardTier::Silver,
        badge: "Silver",
        min_amount: 500_000,
        reward: 50_000,
    },
    TierDefinition {
        tier: RewardTier::Gold,
        badge: "Gold",
        min_amount: 1_000_000,
        reward: 100_000,
    },
];

impl RewardTier {
    pub fn definition(&self) -> &'static TierDefinition {
        let index = match self {
            Self::Bronze => 0,
            Self::Silver => 1,
            Self::Gold => 2,
        };
        &REWARD_TIERS[index]
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RewardOption {
    pub id: u32,
    pub name: &'static str,
    pub name_ko: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

pub const REWARD_OPTIONS: [RewardOption; 4] = [
    RewardOption {
        id: 1,
        name: "Korean Culture Gift Card",
        name_ko: "관광문화상품권",
        description: "Use at tourist attractions, cultural sites, and more",
        category: "culture",
    },
    RewardOption {
        id: 2,
        name: "Olive Young Gift Card",
        name_ko: "올리브영 상품권",
        description: "Popular Korean beauty and health products",
        category: "beauty",
    },
    RewardOption {
        id: 3,
        name: "Concert & Performance Tickets",
        name_ko: "공연티켓",
        description: "K-pop concerts, musicals, and shows",
        category: "entertainment",
    },
    RewardOption {
        id: 4,
        name: "Cafe Gift Cards",
        name_ko: "카페 상품권",
        description: "Popular Korean cafe chains",
        category: "food",
    },
];

pub fn reward_option(id: u32) -> Option<&'static RewardOption> {
    REWARD_OPTIONS.iter().find(|option| option.id == id)
}

/// Duty-free receipt registered by a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyFreeReceipt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub store_name: String,
    pub amount: i64,
    pub items: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardClaim {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: RewardTier,
    pub option_id: u32,
    pub reward_amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptRequest {
    pub store_id: Uuid,
    pub amount: i64,
    #[serde(default)]
    pub items: String,
}

impl ReceiptRequest {
    pub fn validate(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(OmniError::validation("amount must be positive"));
        }
        if self.amount > MAX_RECEIPT_AMOUNT {
            return Err(OmniError::validation(format!(
                "amount must not exceed {MAX_RECEIPT_AMOUNT}"
            )));
        }
        ensure_length("items", &self.items, 0, 1000)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub tier: RewardTier,
    pub option_id: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TierProgress {
    pub total_amount: i64,
    /// Highest tier reached, if any
    pub current_tier: Option<RewardTier>,
    pub next_tier: Option<RewardTier>,
    pub amount_to_next_tier: Option<i64>,
    pub progress_percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct RewardSummary {
    pub progress: TierProgress,
    pub receipts: Vec<DutyFreeReceipt>,
    pub claims: Vec<RewardClaim>,
    /// Reached tiers that have not been claimed yet
    pub claimable_tiers: Vec<RewardTier>,
}
