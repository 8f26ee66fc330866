//! Reviews of partner entities, helpful votes and threaded replies

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{OmniError, Result};
use crate::models::review::{
    ReplyCreate, ReplyResponse, ReplyUpdate, ReviewCreate, ReviewListQuery, ReviewListResponse,
    ReviewResponse, ReviewUpdate, ReviewWithRepliesResponse,
};
use crate::models::user::UserSummary;
use crate::models::{HelpfulMark, PageParams, Review, ReviewReply, ReviewSort};
use crate::storage::{Database, RecordKey, Tables};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

fn author(tables: &Tables, user_id: Uuid) -> UserSummary {
    tables
        .user(user_id)
        .map(|user| user.summary())
        .unwrap_or_else(|| UserSummary {
            id: user_id,
            name: "Unknown user".to_string(),
            email: String::new(),
        })
}

fn find_review(tables: &Tables, review_id: Uuid) -> Result<Review> {
    tables
        .reviews
        .get(&review_id)
        .cloned()
        .ok_or_else(|| OmniError::not_found("Review not found"))
}

fn find_reply(tables: &Tables, reply_id: Uuid) -> Result<ReviewReply> {
    tables
        .replies
        .get(&reply_id)
        .cloned()
        .ok_or_else(|| OmniError::not_found("Reply not found"))
}

fn helpful_count(tables: &Tables, review_id: Uuid) -> usize {
    tables
        .helpful
        .values()
        .filter(|mark| mark.review_id == review_id)
        .count()
}

fn helpful_mark(tables: &Tables, review_id: Uuid, user_id: Uuid) -> Option<&HelpfulMark> {
    tables
        .helpful
        .values()
        .find(|mark| mark.review_id == review_id && mark.user_id == user_id)
}

fn review_response(tables: &Tables, review: &Review, viewer: Option<Uuid>) -> ReviewResponse {
    ReviewResponse {
        id: review.id,
        user_id: review.user_id,
        user: author(tables, review.user_id),
        entity_type: review.entity_type,
        entity_id: review.entity_id.clone(),
        rating: review.rating,
        comment: review.comment.clone(),
        helpful_count: helpful_count(tables, review.id),
        user_has_marked_helpful: viewer
            .is_some_and(|viewer| helpful_mark(tables, review.id, viewer).is_some()),
        reply_count: tables
            .replies
            .values()
            .filter(|reply| reply.review_id == review.id)
            .count(),
        created_at: review.created_at,
        updated_at: review.updated_at,
    }
}

/// Replies to `review_id` whose parent is `parent`, oldest first
fn children(tables: &Tables, review_id: Uuid, parent: Option<Uuid>) -> Vec<&ReviewReply> {
    let mut replies: Vec<&ReviewReply> = tables
        .replies
        .values()
        .filter(|reply| reply.review_id == review_id && reply.parent_reply_id == parent)
        .collect();
    replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    replies
}

fn reply_response(tables: &Tables, reply: &ReviewReply) -> ReplyResponse {
    ReplyResponse {
        id: reply.id,
        review_id: reply.review_id,
        user_id: reply.user_id,
        user: author(tables, reply.user_id),
        parent_reply_id: reply.parent_reply_id,
        comment: reply.comment.clone(),
        created_at: reply.created_at,
        updated_at: reply.updated_at,
        child_replies: children(tables, reply.review_id, Some(reply.id))
            .into_iter()
            .map(|child| reply_response(tables, child))
            .collect(),
    }
}

fn reply_tree(tables: &Tables, review_id: Uuid) -> Vec<ReplyResponse> {
    children(tables, review_id, None)
        .into_iter()
        .map(|reply| reply_response(tables, reply))
        .collect()
}

/// `reply_id` and every reply nested below it
fn subtree(tables: &Tables, reply_id: Uuid) -> Vec<Uuid> {
    let mut ids = vec![reply_id];
    let mut cursor = 0;
    while cursor < ids.len() {
        let parent = ids[cursor];
        ids.extend(
            tables
                .replies
                .values()
                .filter(|reply| reply.parent_reply_id == Some(parent))
                .map(|reply| reply.id),
        );
        cursor += 1;
    }
    ids
}

pub fn create(db: &Database, user_id: Uuid, request: ReviewCreate) -> Result<ReviewResponse> {
    request.validate()?;
    let entity_id = request.entity_id.trim().to_string();

    let response = db.transact(|tx| {
        let duplicate = tx.tables().reviews.values().any(|review| {
            review.user_id == user_id
                && review.entity_type == request.entity_type
                && review.entity_id == entity_id
        });
        if duplicate {
            return Err(OmniError::conflict(
                "You have already reviewed this item. Use update endpoint to modify your review.",
            ));
        }

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4(),
            user_id,
            entity_type: request.entity_type,
            entity_id: entity_id.clone(),
            rating: request.rating,
            comment: request.comment.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        tx.put(review.clone());
        Ok(review_response(tx.tables(), &review, Some(user_id)))
    })?;

    info!(review_id = %response.id, %user_id, "review created");
    Ok(response)
}

pub fn list(
    db: &Database,
    query: &ReviewListQuery,
    viewer: Option<Uuid>,
) -> Result<ReviewListResponse> {
    let page = PageParams {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;

    db.read(|tables| {
        let mut reviews: Vec<&Review> = tables
            .reviews
            .values()
            .filter(|review| {
                review.entity_type == query.entity_type && review.entity_id == query.entity_id
            })
            .collect();

        let total = reviews.len();
        let mut distribution: BTreeMap<String, usize> =
            (1..=5).map(|rating| (rating.to_string(), 0)).collect();
        let mut rating_sum = 0u64;
        for review in &reviews {
            rating_sum += u64::from(review.rating);
            if let Some(count) = distribution.get_mut(&review.rating.to_string()) {
                *count += 1;
            }
        }
        let average_rating = if total == 0 {
            0.0
        } else {
            (rating_sum as f64 / total as f64 * 10.0).round() / 10.0
        };

        // Newest first, then the requested ordering on top (stable sort)
        reviews.sort_by_key(|review| (Reverse(review.created_at), review.id));
        match query.sort_by {
            ReviewSort::Recent => {}
            ReviewSort::Helpful => {
                reviews.sort_by_key(|review| Reverse(helpful_count(tables, review.id)))
            }
            ReviewSort::RatingHigh => reviews.sort_by_key(|review| Reverse(review.rating)),
            ReviewSort::RatingLow => reviews.sort_by_key(|review| review.rating),
        }

        ReviewListResponse {
            reviews: page
                .slice(reviews)
                .into_iter()
                .map(|review| review_response(tables, review, viewer))
                .collect(),
            total,
            page: page.page,
            page_size: page.page_size,
            average_rating,
            rating_distribution: distribution,
        }
    })
}

pub fn get(
    db: &Database,
    review_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<ReviewWithRepliesResponse> {
    db.read(|tables| -> Result<ReviewWithRepliesResponse> {
        let review = find_review(tables, review_id)?;
        Ok(ReviewWithRepliesResponse {
            review: review_response(tables, &review, viewer),
            replies: reply_tree(tables, review_id),
        })
    })?
}

pub fn update(
    db: &Database,
    user_id: Uuid,
    review_id: Uuid,
    request: ReviewUpdate,
) -> Result<ReviewResponse> {
    request.validate()?;

    db.transact(|tx| {
        let mut review = find_review(tx.tables(), review_id)?;
        if review.user_id != user_id {
            return Err(OmniError::forbidden("You can only edit your own reviews"));
        }

        if let Some(rating) = request.rating {
            review.rating = rating;
        }
        if let Some(comment) = request.comment {
            review.comment = comment.trim().to_string();
        }
        review.updated_at = Utc::now();
        tx.put(review.clone());
        Ok(review_response(tx.tables(), &review, Some(user_id)))
    })
}

/// Deletes the review together with its replies and helpful marks.
pub fn delete(db: &Database, user_id: Uuid, review_id: Uuid) -> Result<()> {
    db.transact(|tx| {
        let review = find_review(tx.tables(), review_id)?;
        if review.user_id != user_id {
            return Err(OmniError::forbidden("You can only delete your own reviews"));
        }

        let replies: Vec<Uuid> = tx
            .tables()
            .replies
            .values()
            .filter(|reply| reply.review_id == review_id)
            .map(|reply| reply.id)
            .collect();
        let marks: Vec<Uuid> = tx
            .tables()
            .helpful
            .values()
            .filter(|mark| mark.review_id == review_id)
            .map(|mark| mark.id)
            .collect();

        for id in replies {
            tx.delete(RecordKey::Reply(id));
        }
        for id in marks {
            tx.delete(RecordKey::Helpful(id));
        }
        tx.delete(RecordKey::Review(review_id));
        Ok(())
    })?;

    info!(%review_id, %user_id, "review deleted");
    Ok(())
}

pub fn mark_helpful(db: &Database, user_id: Uuid, review_id: Uuid) -> Result<()> {
    db.transact(|tx| {
        find_review(tx.tables(), review_id)?;
        if helpful_mark(tx.tables(), review_id, user_id).is_some() {
            return Err(OmniError::conflict(
                "You have already marked this review as helpful",
            ));
        }
        tx.put(HelpfulMark {
            id: Uuid::new_v4(),
            review_id,
            user_id,
            created_at: Utc::now(),
        });
        Ok(())
    })
}

pub fn unmark_helpful(db: &Database, user_id: Uuid, review_id: Uuid) -> Result<()> {
    db.transact(|tx| {
        let mark_id = helpful_mark(tx.tables(), review_id, user_id)
            .map(|mark| mark.id)
            .ok_or_else(|| OmniError::not_found("Helpful mark not found"))?;
        tx.delete(RecordKey::Helpful(mark_id));
        Ok(())
    })
}

pub fn create_reply(
    db: &Database,
    user_id: Uuid,
    review_id: Uuid,
    request: ReplyCreate,
) -> Result<ReplyResponse> {
    request.validate()?;

    db.transact(|tx| {
        find_review(tx.tables(), review_id)?;
        if let Some(parent_id) = request.parent_reply_id {
            let parent_in_review = tx
                .tables()
                .replies
                .get(&parent_id)
                .is_some_and(|parent| parent.review_id == review_id);
            if !parent_in_review {
                return Err(OmniError::not_found("Parent reply not found"));
            }
        }

        let now = Utc::now();
        let reply = ReviewReply {
            id: Uuid::new_v4(),
            review_id,
            user_id,
            parent_reply_id: request.parent_reply_id,
            comment: request.comment.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        tx.put(reply.clone());
        Ok(reply_response(tx.tables(), &reply))
    })
}

pub fn replies(db: &Database, review_id: Uuid) -> Result<Vec<ReplyResponse>> {
    db.read(|tables| -> Result<Vec<ReplyResponse>> {
        find_review(tables, review_id)?;
        Ok(reply_tree(tables, review_id))
    })?
}

pub fn update_reply(
    db: &Database,
    user_id: Uuid,
    reply_id: Uuid,
    request: ReplyUpdate,
) -> Result<ReplyResponse> {
    request.validate()?;

    db.transact(|tx| {
        let mut reply = find_reply(tx.tables(), reply_id)?;
        if reply.user_id != user_id {
            return Err(OmniError::forbidden("You can only edit your own replies"));
        }
        reply.comment = request.comment.trim().to_string();
        reply.updated_at = Utc::now();
        tx.put(reply.clone());
        Ok(reply_response(tx.tables(), &reply))
    })
}

/// Deletes the reply and everything nested below it.
pub fn delete_reply(db: &Database, user_id: Uuid, reply_id: Uuid) -> Result<()> {
    db.transact(|tx| {
        let reply = find_reply(tx.tables(), reply_id)?;
        if reply.user_id != user_id {
            return Err(OmniError::forbidden("You can only delete your own replies"));
        }
        for id in subtree(tx.tables(), reply_id) {
            tx.delete(RecordKey::Reply(id));
        }
        Ok(())
    })
}
