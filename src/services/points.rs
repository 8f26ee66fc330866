//! OMNI Points ledger
//!
//! Every balance change is written together with its ledger entry inside one
//! storage transaction, so the balance always equals the sum of the ledger and
//! never drops below zero.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::{OmniError, Result};
use crate::models::points::{
    ChargeRequest, EarnRequest, KRW_PER_RATE_UNIT, MAX_CUSTOM_CHARGE, MIN_CUSTOM_CHARGE,
    SpendRequest, TransactionPage, TransactionQuery,
};
use crate::models::{PointBalance, PointTransaction, TransactionSource, TransactionType};
use crate::storage::{Database, Tx};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Writes a ledger entry and moves the balance by `amount` in the direction
/// of `kind`.
pub(crate) fn post(
    tx: &mut Tx<'_>,
    user_id: Uuid,
    kind: TransactionType,
    source: TransactionSource,
    amount: i64,
    description: Option<String>,
    now: DateTime<Utc>,
) -> Result<PointTransaction> {
    if amount <= 0 {
        return Err(OmniError::validation("amount must be positive"));
    }

    let mut balance = tx
        .tables()
        .balances
        .get(&user_id)
        .cloned()
        .unwrap_or_else(|| PointBalance::empty(user_id, now));

    let updated = balance
        .balance
        .checked_add(kind.sign() * amount)
        .ok_or_else(|| OmniError::validation("amount is too large"))?;
    if updated < 0 {
        return Err(OmniError::InsufficientPoints {
            balance: balance.balance,
            requested: amount,
        });
    }

    balance.balance = updated;
    balance.last_updated = now;

    let transaction = PointTransaction {
        id: Uuid::new_v4(),
        user_id,
        amount,
        kind,
        source,
        description,
        balance_after: updated,
        created_at: now,
    };

    tx.put(balance);
    tx.put(transaction.clone());
    Ok(transaction)
}

/// Points for a purchase: one `point_rate` unit per 1000 KRW, rounded down.
pub fn purchase_points(purchase_amount: i64, point_rate: f64) -> i64 {
    if purchase_amount <= 0 || point_rate <= 0.0 {
        return 0;
    }
    (purchase_amount as f64 / KRW_PER_RATE_UNIT as f64 * point_rate).floor() as i64
}

pub fn validate_charge_amount(amount: i64) -> Result<()> {
    if (MIN_CUSTOM_CHARGE..=MAX_CUSTOM_CHARGE).contains(&amount) {
        Ok(())
    } else {
        Err(OmniError::validation(format!(
            "charge amount must be between {MIN_CUSTOM_CHARGE} and {MAX_CUSTOM_CHARGE}"
        )))
    }
}

pub fn balance(db: &Database, user_id: Uuid) -> Result<PointBalance> {
    db.read(|tables| {
        tables
            .balances
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| PointBalance::empty(user_id, Utc::now()))
    })
}

pub fn transactions(
    db: &Database,
    user_id: Uuid,
    query: &TransactionQuery,
) -> Result<TransactionPage> {
    let page = query
        .page_params()
        .resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;

    let mut entries: Vec<PointTransaction> = db.read(|tables| {
        tables
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| query.kind.is_none_or(|kind| t.kind == kind))
            .cloned()
            .collect()
    })?;
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let total = entries.len();
    Ok(TransactionPage {
        transactions: page.slice(entries),
        total,
        page: page.page,
        page_size: page.page_size,
    })
}

pub fn charge(db: &Database, user_id: Uuid, request: &ChargeRequest) -> Result<PointTransaction> {
    validate_charge_amount(request.amount)?;
    let transaction = db.transact(|tx| {
        post(
            tx,
            user_id,
            TransactionType::Charge,
            TransactionSource::CardCharge,
            request.amount,
            Some(format!("Card charge of {} points", request.amount)),
            Utc::now(),
        )
    })?;
    info!(%user_id, amount = request.amount, "points charged");
    Ok(transaction)
}

pub fn earn(db: &Database, user_id: Uuid, request: &EarnRequest) -> Result<PointTransaction> {
    if request.purchase_amount <= 0 {
        return Err(OmniError::validation("purchase_amount must be positive"));
    }

    let transaction = db.transact(|tx| {
        let store = tx
            .tables()
            .stores
            .get(&request.store_id)
            .cloned()
            .ok_or_else(|| OmniError::not_found("Store not found"))?;

        let points = purchase_points(request.purchase_amount, store.point_rate);
        if points == 0 {
            return Err(OmniError::validation(
                "purchase_amount is too small to earn points",
            ));
        }

        post(
            tx,
            user_id,
            TransactionType::Earn,
            TransactionSource::Purchase,
            points,
            Some(format!("Purchase at {}", store.name)),
            Utc::now(),
        )
    })?;
    info!(%user_id, points = transaction.amount, "points earned");
    Ok(transaction)
}

pub fn spend(db: &Database, user_id: Uuid, request: &SpendRequest) -> Result<PointTransaction> {
    if request.amount <= 0 {
        return Err(OmniError::validation("amount must be positive"));
    }

    db.transact(|tx| {
        let description = match (&request.description, request.store_id) {
            (Some(description), _) => Some(description.trim().to_string()),
            (None, Some(store_id)) => {
                let store = tx
                    .tables()
                    .stores
                    .get(&store_id)
                    .ok_or_else(|| OmniError::not_found("Store not found"))?;
                Some(format!("Spent at {}", store.name))
            }
            (None, None) => None,
        };

        post(
            tx,
            user_id,
            TransactionType::Spend,
            TransactionSource::Purchase,
            request.amount,
            description,
            Utc::now(),
        )
    })
}
