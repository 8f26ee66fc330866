//! Duty-free purchase tiers and reward claims

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{OmniError, Result};
use crate::models::reward::{
    ClaimRequest, REWARD_TIERS, ReceiptRequest, RewardSummary, TierProgress, reward_option,
};
use crate::models::{DutyFreeReceipt, RewardClaim, RewardTier, StoreCategory};
use crate::storage::{Database, Tables};

/// Highest tier whose threshold `total_amount` reaches
pub fn tier_for(total_amount: i64) -> Option<RewardTier> {
    REWARD_TIERS
        .iter()
        .rev()
        .find(|definition| total_amount >= definition.min_amount)
        .map(|definition| definition.tier)
}

pub fn progress(total_amount: i64) -> TierProgress {
    let current = tier_for(total_amount);
    let next = match current {
        None => Some(&REWARD_TIERS[0]),
        Some(tier) => REWARD_TIERS
            .iter()
            .find(|definition| definition.min_amount > tier.definition().min_amount),
    };

    let percentage = match (current, next) {
        (_, None) => 100.0,
        (None, Some(next)) => total_amount as f64 / next.min_amount as f64 * 100.0,
        (Some(current), Some(next)) => {
            let floor = current.definition().min_amount;
            (total_amount - floor) as f64 / (next.min_amount - floor) as f64 * 100.0
        }
    };

    TierProgress {
        total_amount,
        current_tier: current,
        next_tier: next.map(|definition| definition.tier),
        amount_to_next_tier: next.map(|definition| definition.min_amount - total_amount),
        progress_percentage: percentage.clamp(0.0, 100.0),
    }
}

/// Saturating sum; the total never wraps
fn total_spent(tables: &Tables, user_id: Uuid) -> i64 {
    tables
        .receipts
        .values()
        .filter(|receipt| receipt.user_id == user_id)
        .fold(0i64, |total, receipt| total.saturating_add(receipt.amount))
}

pub fn record_receipt(
    db: &Database,
    user_id: Uuid,
    request: ReceiptRequest,
) -> Result<DutyFreeReceipt> {
    request.validate()?;

    let receipt = db.transact(|tx| {
        let store = tx
            .tables()
            .stores
            .get(&request.store_id)
            .cloned()
            .ok_or_else(|| OmniError::not_found("Store not found"))?;
        if store.category != StoreCategory::DutyFree {
            return Err(OmniError::validation(
                "Receipts can only be registered for duty-free stores",
            ));
        }

        let receipt = DutyFreeReceipt {
            id: Uuid::new_v4(),
            user_id,
            store_id: store.id,
            store_name: store.name,
            amount: request.amount,
            items: request.items.trim().to_string(),
            created_at: Utc::now(),
        };
        tx.put(receipt.clone());
        Ok(receipt)
    })?;

    info!(%user_id, amount = receipt.amount, "duty-free receipt recorded");
    Ok(receipt)
}

pub fn summary(db: &Database, user_id: Uuid) -> Result<RewardSummary> {
    db.read(|tables| {
        let mut receipts: Vec<DutyFreeReceipt> = tables
            .receipts
            .values()
            .filter(|receipt| receipt.user_id == user_id)
            .cloned()
            .collect();
        receipts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut claims: Vec<RewardClaim> = tables
            .claims
            .values()
            .filter(|claim| claim.user_id == user_id)
            .cloned()
            .collect();
        claims.sort_by_key(|claim| claim.tier);

        let progress = progress(total_spent(tables, user_id));
        let claimable_tiers = REWARD_TIERS
            .iter()
            .map(|definition| definition.tier)
            .filter(|tier| progress.current_tier.is_some_and(|current| *tier <= current))
            .filter(|tier| !claims.iter().any(|claim| claim.tier == *tier))
            .collect();

        RewardSummary {
            progress,
            receipts,
            claims,
            claimable_tiers,
        }
    })
}

pub fn claim(db: &Database, user_id: Uuid, request: &ClaimRequest) -> Result<RewardClaim> {
    let option = reward_option(request.option_id)
        .ok_or_else(|| OmniError::not_found("Reward option not found"))?;

    let claim = db.transact(|tx| {
        let reached = tier_for(total_spent(tx.tables(), user_id));
        if reached.is_none_or(|current| request.tier > current) {
            return Err(OmniError::bad_request(format!(
                "{} tier has not been reached yet",
                request.tier.definition().badge
            )));
        }

        let already_claimed = tx
            .tables()
            .claims
            .values()
            .any(|claim| claim.user_id == user_id && claim.tier == request.tier);
        if already_claimed {
            return Err(OmniError::conflict(format!(
                "{} tier reward has already been claimed",
                request.tier.definition().badge
            )));
        }

        let claim = RewardClaim {
            id: Uuid::new_v4(),
            user_id,
            tier: request.tier,
            option_id: option.id,
            reward_amount: request.tier.definition().reward,
            created_at: Utc::now(),
        };
        tx.put(claim.clone());
        Ok(claim)
    })?;

    info!(%user_id, tier = ?claim.tier, option = option.name, "reward claimed");
    Ok(claim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reward::MAX_RECEIPT_AMOUNT;
    use crate::models::store::CreateStoreRequest;
    use crate::services::stores;

    #[test]
    fn test_tier_lookup() {
        assert_eq!(tier_for(0), None);
        assert_eq!(tier_for(299_999), None);
        assert_eq!(tier_for(300_000), Some(RewardTier::Bronze));
        assert_eq!(tier_for(850_000), Some(RewardTier::Silver));
        assert_eq!(tier_for(1_000_000), Some(RewardTier::Gold));
    }

    #[test]
    fn test_progress() {
        let none = progress(150_000);
        assert_eq!(none.current_tier, None);
        assert_eq!(none.next_tier, Some(RewardTier::Bronze));
        assert_eq!(none.amount_to_next_tier, Some(150_000));
        assert_eq!(none.progress_percentage, 50.0);

        let bronze = progress(400_000);
        assert_eq!(bronze.current_tier, Some(RewardTier::Bronze));
        assert_eq!(bronze.next_tier, Some(RewardTier::Silver));
        assert_eq!(bronze.progress_percentage, 50.0);

        let gold = progress(2_000_000);
        assert_eq!(gold.next_tier, None);
        assert_eq!(gold.amount_to_next_tier, None);
        assert_eq!(gold.progress_percentage, 100.0);
    }

    fn duty_free_store(db: &Database, category: StoreCategory) -> Uuid {
        stores::create(
            db,
            CreateStoreRequest {
                name: "Lotte Duty Free Seoul".to_string(),
                category,
                description: None,
                address: "30 Eulji-ro, Jung-gu, Seoul".to_string(),
                latitude: 37.5665,
                longitude: 126.9780,
                point_rate: Some(10.0),
                images: vec![],
                opening_hours: None,
                contact: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_claim_requires_reached_tier_once() {
        let db = Database::in_memory();
        let store_id = duty_free_store(&db, StoreCategory::DutyFree);
        let user_id = Uuid::new_v4();

        let request = ClaimRequest {
            tier: RewardTier::Bronze,
            option_id: 2,
        };
        assert!(matches!(
            claim(&db, user_id, &request),
            Err(OmniError::BadRequest(_))
        ));

        record_receipt(
            &db,
            user_id,
            ReceiptRequest {
                store_id,
                amount: 320_000,
                items: "Cosmetics".to_string(),
            },
        )
        .unwrap();

        let granted = claim(&db, user_id, &request).unwrap();
        assert_eq!(granted.reward_amount, 30_000);
        assert!(claim(&db, user_id, &request).is_err());

        let silver = ClaimRequest {
            tier: RewardTier::Silver,
            option_id: 1,
        };
        assert!(claim(&db, user_id, &silver).is_err());

        let summary = summary(&db, user_id).unwrap();
        assert_eq!(summary.progress.total_amount, 320_000);
        assert!(summary.claimable_tiers.is_empty());
        assert_eq!(summary.claims.len(), 1);
    }

    #[test]
    fn test_receipts_only_for_duty_free_stores() {
        let db = Database::in_memory();
        let store_id = duty_free_store(&db, StoreCategory::Restaurant);
        let result = record_receipt(
            &db,
            Uuid::new_v4(),
            ReceiptRequest {
                store_id,
                amount: 10_000,
                items: String::new(),
            },
        );
        assert!(matches!(result, Err(OmniError::Validation(_))));
    }

    #[test]
    fn test_oversized_receipt_is_rejected() {
        let db = Database::in_memory();
        let store_id = duty_free_store(&db, StoreCategory::DutyFree);
        let user_id = Uuid::new_v4();

        let result = record_receipt(
            &db,
            user_id,
            ReceiptRequest {
                store_id,
                amount: MAX_RECEIPT_AMOUNT + 1,
                items: String::new(),
            },
        );
        assert!(matches!(result, Err(OmniError::Validation(_))));

        let accepted = record_receipt(
            &db,
            user_id,
            ReceiptRequest {
                store_id,
                amount: MAX_RECEIPT_AMOUNT,
                items: String::new(),
            },
        );
        assert!(accepted.is_ok());
    }

    #[test]
    fn test_huge_totals_saturate_instead_of_overflowing() {
        let db = Database::in_memory();
        let store_id = duty_free_store(&db, StoreCategory::DutyFree);
        let user_id = Uuid::new_v4();

        // Stored directly, as a legacy WAL could carry amounts above the cap
        db.transact(|tx| {
            for amount in [i64::MAX, 1] {
                tx.put(DutyFreeReceipt {
                    id: Uuid::new_v4(),
                    user_id,
                    store_id,
                    store_name: "Lotte Duty Free Seoul".to_string(),
                    amount,
                    items: String::new(),
                    created_at: Utc::now(),
                });
            }
            Ok(())
        })
        .unwrap();

        let gold = ClaimRequest {
            tier: RewardTier::Gold,
            option_id: 1,
        };
        assert_eq!(claim(&db, user_id, &gold).unwrap().tier, RewardTier::Gold);

        let summary = summary(&db, user_id).unwrap();
        assert_eq!(summary.progress.total_amount, i64::MAX);
        assert_eq!(summary.progress.current_tier, Some(RewardTier::Gold));

        // The store is still usable afterwards
        assert!(db.read(|tables| tables.receipts.len()).is_ok());
    }
}
