use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{PageParams, default_page};

/// Preset amounts offered by the charge dialog
pub const CHARGE_PRESETS: &[i64] = &[1_000, 3_000, 5_000, 10_000, 20_000, 50_000];
pub const MIN_CUSTOM_CHARGE: i64 = 1;
pub const MAX_CUSTOM_CHARGE: i64 = 1_000_000;

/// Purchase amount (KRW) that one unit of a store's `point_rate` applies to
pub const KRW_PER_RATE_UNIT: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Earn,
    Spend,
    Charge,
}

impl TransactionType {
    /// Sign applied to the balance
    pub fn sign(&self) -> i64 {
        match self {
            Self::Earn | Self::Charge => 1,
            Self::Spend => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    Purchase,
    Mission,
    CardCharge,
    Refund,
}

/// Ledger entry; `amount` is always positive, direction comes from `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub source: TransactionSource,
    pub description: Option<String>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointBalance {
    pub user_id: Uuid,
    pub balance: i64,
    pub last_updated: DateTime<Utc>,
}

impl PointBalance {
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: 0,
            last_updated: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeRequest {
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EarnRequest {
    pub store_id: Uuid,
    /// Purchase total in KRW
    pub purchase_amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpendRequest {
    pub amount: i64,
    pub description: Option<String>,
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionQuery {
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    #[serde(default = "default_page")]
    pub page: u32,
    pub page_size: Option<u32>,
}

impl TransactionQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<PointTransaction>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct ChargeOptions {
    pub presets: &'static [i64],
    pub min_custom: i64,
    pub max_custom: i64,
}

impl Default for ChargeOptions {
    fn default() -> Self {
        Self {
            presets: CHARGE_PRESETS,
            min_custom: MIN_CUSTOM_CHARGE,
            max_custom: MAX_CUSTOM_CHARGE,
        }
    }
}
