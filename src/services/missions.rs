//! Eco-missions: start, progress, photo proof and admin review
//!
//! A member runs each mission at most once. Missions without a photo
//! requirement complete as soon as progress reaches `max_progress`; photo
//! missions complete when an admin approves the uploaded proof. Points are
//! awarded in the same transaction that marks the run completed.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::points;
use crate::error::{OmniError, Result};
use crate::models::mission::{
    CreateMissionRequest, PhotoSubmission, ReviewDecision, UserMissionResponse,
};
use crate::models::{
    Mission, MissionPhoto, MissionType, TransactionSource, TransactionType, UserMission,
    UserMissionStatus,
};
use crate::storage::{Database, Tables, Tx};

fn find_mission(tables: &Tables, mission_id: Uuid) -> Result<Mission> {
    tables
        .missions
        .get(&mission_id)
        .cloned()
        .ok_or_else(|| OmniError::not_found("Mission not found"))
}

fn find_run(tables: &Tables, user_id: Uuid, mission_id: Uuid) -> Option<UserMission> {
    tables
        .user_missions
        .values()
        .find(|run| run.user_id == user_id && run.mission_id == mission_id)
        .cloned()
}

fn started_run(tables: &Tables, user_id: Uuid, mission_id: Uuid) -> Result<(UserMission, Mission)> {
    let mission = find_mission(tables, mission_id)?;
    let run = find_run(tables, user_id, mission_id)
        .ok_or_else(|| OmniError::not_found("Mission not started"))?;
    Ok((run, mission))
}

fn ensure_not_expired(mission: &Mission, now: DateTime<Utc>) -> Result<()> {
    if mission.is_expired(now) {
        Err(OmniError::bad_request("Mission has expired"))
    } else {
        Ok(())
    }
}

/// Marks the run completed and credits the mission's points.
fn complete_run(
    tx: &mut Tx<'_>,
    run: &mut UserMission,
    mission: &Mission,
    now: DateTime<Utc>,
) -> Result<()> {
    run.status = UserMissionStatus::Completed;
    run.progress = mission.max_progress;
    run.completed_at = Some(now);
    run.updated_at = now;
    tx.put(run.clone());

    points::post(
        tx,
        run.user_id,
        TransactionType::Earn,
        TransactionSource::Mission,
        mission.points,
        Some(format!("Mission completed: {}", mission.title)),
        now,
    )?;
    Ok(())
}

/// Missions that have not expired, optionally of one type
pub fn available(db: &Database, kind: Option<MissionType>) -> Result<Vec<Mission>> {
    let now = Utc::now();
    let mut missions: Vec<Mission> = db.read(|tables| {
        tables
            .missions
            .values()
            .filter(|mission| !mission.is_expired(now))
            .filter(|mission| kind.is_none_or(|k| mission.kind == k))
            .cloned()
            .collect()
    })?;
    missions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.title.cmp(&b.title)));
    Ok(missions)
}

pub fn my_missions(db: &Database, user_id: Uuid) -> Result<Vec<UserMissionResponse>> {
    let now = Utc::now();
    let mut runs: Vec<UserMissionResponse> = db.read(|tables| {
        tables
            .user_missions
            .values()
            .filter(|run| run.user_id == user_id)
            .filter_map(|run| {
                tables
                    .missions
                    .get(&run.mission_id)
                    .map(|mission| UserMissionResponse::new(run, mission, now))
            })
            .collect()
    })?;
    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(runs)
}

pub fn start(db: &Database, user_id: Uuid, mission_id: Uuid) -> Result<UserMissionResponse> {
    let now = Utc::now();
    let (run, mission) = db.transact(|tx| {
        let mission = find_mission(tx.tables(), mission_id)?;
        ensure_not_expired(&mission, now)?;

        if let Some(existing) = find_run(tx.tables(), user_id, mission_id) {
            return Err(match existing.status {
                UserMissionStatus::Completed => OmniError::conflict("Mission already completed"),
                _ => OmniError::conflict("Mission already started"),
            });
        }

        let run = UserMission {
            id: Uuid::new_v4(),
            user_id,
            mission_id,
            status: UserMissionStatus::Active,
            progress: 0,
            photo: None,
            rejection_reason: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        tx.put(run.clone());
        Ok((run, mission))
    })?;

    info!(%user_id, %mission_id, "mission started");
    Ok(UserMissionResponse::new(&run, &mission, now))
}

pub fn record_progress(
    db: &Database,
    user_id: Uuid,
    mission_id: Uuid,
    increment: u32,
) -> Result<UserMissionResponse> {
    if increment == 0 {
        return Err(OmniError::validation("increment must be at least 1"));
    }

    let now = Utc::now();
    let (run, mission) = db.transact(|tx| {
        let (mut run, mission) = started_run(tx.tables(), user_id, mission_id)?;
        if run.status != UserMissionStatus::Active {
            return Err(OmniError::bad_request("Mission is not active"));
        }
        ensure_not_expired(&mission, now)?;

        run.progress = run
            .progress
            .saturating_add(increment)
            .min(mission.max_progress);
        run.updated_at = now;

        if run.progress >= mission.max_progress && !mission.requires_photo {
            complete_run(tx, &mut run, &mission, now)?;
        } else {
            tx.put(run.clone());
        }
        Ok((run, mission))
    })?;

    if run.status == UserMissionStatus::Completed {
        info!(%user_id, %mission_id, points = mission.points, "mission completed");
    }
    Ok(UserMissionResponse::new(&run, &mission, now))
}

pub fn submit_photo(
    db: &Database,
    user_id: Uuid,
    mission_id: Uuid,
    submission: PhotoSubmission,
) -> Result<UserMissionResponse> {
    submission.validate()?;

    let now = Utc::now();
    let (run, mission) = db.transact(|tx| {
        let (mut run, mission) = started_run(tx.tables(), user_id, mission_id)?;
        if !mission.requires_photo {
            return Err(OmniError::validation("Mission does not require a photo"));
        }
        if !run.status.is_open() {
            return Err(OmniError::bad_request("Mission is not accepting photos"));
        }
        ensure_not_expired(&mission, now)?;

        run.photo = Some(MissionPhoto {
            url: submission.url.trim().to_string(),
            latitude: submission.latitude,
            longitude: submission.longitude,
            uploaded_at: now,
        });
        run.status = UserMissionStatus::PendingReview;
        run.rejection_reason = None;
        run.updated_at = now;
        tx.put(run.clone());
        Ok((run, mission))
    })?;

    info!(%user_id, %mission_id, "mission photo submitted for review");
    Ok(UserMissionResponse::new(&run, &mission, now))
}

pub fn complete(db: &Database, user_id: Uuid, mission_id: Uuid) -> Result<UserMissionResponse> {
    let now = Utc::now();
    let (run, mission) = db.transact(|tx| {
        let (mut run, mission) = started_run(tx.tables(), user_id, mission_id)?;
        match run.status {
            UserMissionStatus::Completed => {
                return Err(OmniError::conflict("Mission already completed"));
            }
            UserMissionStatus::PendingReview => {
                return Err(OmniError::bad_request("Mission photo is awaiting review"));
            }
            _ => {}
        }
        if mission.requires_photo {
            return Err(OmniError::bad_request(
                "Mission requires an approved photo to complete",
            ));
        }
        ensure_not_expired(&mission, now)?;
        if run.progress < mission.max_progress {
            return Err(OmniError::bad_request("Mission progress is not complete"));
        }

        complete_run(tx, &mut run, &mission, now)?;
        Ok((run, mission))
    })?;

    info!(%user_id, %mission_id, points = mission.points, "mission completed");
    Ok(UserMissionResponse::new(&run, &mission, now))
}

pub fn progress_of(db: &Database, user_id: Uuid, mission_id: Uuid) -> Result<UserMissionResponse> {
    let (run, mission) = db.read(|tables| started_run(tables, user_id, mission_id))??;
    Ok(UserMissionResponse::new(&run, &mission, Utc::now()))
}

/// Admin decision on a submitted photo
pub fn review_photo(
    db: &Database,
    user_mission_id: Uuid,
    decision: ReviewDecision,
) -> Result<UserMissionResponse> {
    let reason = decision
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string);
    if !decision.approve && reason.is_none() {
        return Err(OmniError::validation("reason is required when rejecting"));
    }

    let now = Utc::now();
    let (run, mission) = db.transact(|tx| {
        let mut run = tx
            .tables()
            .user_missions
            .get(&user_mission_id)
            .cloned()
            .ok_or_else(|| OmniError::not_found("User mission not found"))?;
        if run.status != UserMissionStatus::PendingReview {
            return Err(OmniError::bad_request("Mission is not awaiting review"));
        }
        let mission = find_mission(tx.tables(), run.mission_id)?;

        if decision.approve {
            run.rejection_reason = None;
            complete_run(tx, &mut run, &mission, now)?;
        } else {
            run.status = UserMissionStatus::Rejected;
            run.rejection_reason = reason;
            run.updated_at = now;
            tx.put(run.clone());
        }
        Ok((run, mission))
    })?;

    info!(
        %user_mission_id,
        approved = decision.approve,
        "mission photo reviewed"
    );
    Ok(UserMissionResponse::new(&run, &mission, now))
}

pub fn create(db: &Database, request: CreateMissionRequest) -> Result<Mission> {
    request.validate()?;

    let mission = Mission {
        id: Uuid::new_v4(),
        title: request.title.trim().to_string(),
        description: request.description.trim().to_string(),
        points: request.points,
        kind: request.kind,
        requirements: request.requirements,
        max_progress: request.max_progress.unwrap_or(1),
        requires_photo: request.requires_photo,
        expires_at: request.expires_at,
        created_at: Utc::now(),
    };
    db.transact(|tx| {
        tx.put(mission.clone());
        Ok(())
    })?;
    info!(mission_id = %mission.id, title = %mission.title, "mission created");
    Ok(mission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn mission(db: &Database, max_progress: u32, requires_photo: bool) -> Mission {
        create(
            db,
            CreateMissionRequest {
                title: "Use Public Transportation".to_string(),
                description: "Take the subway or bus".to_string(),
                points: 50,
                kind: MissionType::Daily,
                requirements: vec!["Tap a T-money card".to_string()],
                max_progress: Some(max_progress),
                requires_photo,
                expires_at: None,
            },
        )
        .unwrap()
    }

    fn balance(db: &Database, user_id: Uuid) -> i64 {
        db.read(|tables| tables.balance_of(user_id)).unwrap()
    }

    #[test]
    fn test_progress_completes_and_awards_once() {
        let db = Database::in_memory();
        let mission = mission(&db, 3, false);
        let user_id = Uuid::new_v4();

        start(&db, user_id, mission.id).unwrap();
        let run = record_progress(&db, user_id, mission.id, 2).unwrap();
        assert_eq!(run.status, UserMissionStatus::Active);
        assert_eq!(run.progress_percentage, 67);

        let run = record_progress(&db, user_id, mission.id, 5).unwrap();
        assert_eq!(run.status, UserMissionStatus::Completed);
        assert_eq!(run.progress, 3);
        assert_eq!(balance(&db, user_id), 50);

        assert!(record_progress(&db, user_id, mission.id, 1).is_err());
        assert!(complete(&db, user_id, mission.id).is_err());
        assert_eq!(balance(&db, user_id), 50);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let db = Database::in_memory();
        let mission = mission(&db, 1, false);
        let user_id = Uuid::new_v4();

        start(&db, user_id, mission.id).unwrap();
        assert!(matches!(
            start(&db, user_id, mission.id),
            Err(OmniError::Conflict(_))
        ));
        assert!(matches!(
            start(&db, user_id, Uuid::new_v4()),
            Err(OmniError::NotFound(_))
        ));
    }

    #[test]
    fn test_photo_review_cycle() {
        let db = Database::in_memory();
        let mission = mission(&db, 1, true);
        let user_id = Uuid::new_v4();
        start(&db, user_id, mission.id).unwrap();

        // Reaching max progress does not complete a photo mission
        let run = record_progress(&db, user_id, mission.id, 1).unwrap();
        assert_eq!(run.status, UserMissionStatus::Active);

        let photo = || PhotoSubmission {
            url: "https://cdn.omnipass.kr/cup.jpg".to_string(),
            latitude: Some(37.56),
            longitude: Some(126.97),
        };
        let run = submit_photo(&db, user_id, mission.id, photo()).unwrap();
        assert_eq!(run.status, UserMissionStatus::PendingReview);

        let reject_without_reason = ReviewDecision {
            approve: false,
            reason: Some("  ".to_string()),
        };
        assert!(review_photo(&db, run.id, reject_without_reason).is_err());

        let rejected = review_photo(
            &db,
            run.id,
            ReviewDecision {
                approve: false,
                reason: Some("Photo is blurry".to_string()),
            },
        )
        .unwrap();
        assert_eq!(rejected.status, UserMissionStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Photo is blurry"));
        assert_eq!(balance(&db, user_id), 0);

        submit_photo(&db, user_id, mission.id, photo()).unwrap();
        let approved = review_photo(
            &db,
            run.id,
            ReviewDecision {
                approve: true,
                reason: None,
            },
        )
        .unwrap();
        assert_eq!(approved.status, UserMissionStatus::Completed);
        assert!(approved.rejection_reason.is_none());
        assert_eq!(balance(&db, user_id), 50);
    }

    #[test]
    fn test_expired_mission_reports_expired() {
        let db = Database::in_memory();
        let mission = mission(&db, 2, false);
        let user_id = Uuid::new_v4();
        start(&db, user_id, mission.id).unwrap();

        db.transact(|tx| {
            let mut expired = tx.tables().missions[&mission.id].clone();
            expired.expires_at = Some(Utc::now() - Duration::hours(1));
            tx.put(expired);
            Ok(())
        })
        .unwrap();

        let run = progress_of(&db, user_id, mission.id).unwrap();
        assert_eq!(run.status, UserMissionStatus::Expired);
        assert!(record_progress(&db, user_id, mission.id, 1).is_err());
        assert!(available(&db, None).unwrap().is_empty());
    }
}
