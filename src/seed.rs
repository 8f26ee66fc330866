//! Starter catalogue of partner stores and eco-missions

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Mission, MissionType, PartnerStore, StoreCategory};
use crate::storage::Database;

struct StoreSeed {
    name: &'static str,
    category: StoreCategory,
    description: &'static str,
    address: &'static str,
    latitude: f64,
    longitude: f64,
    point_rate: f64,
    opening_hours: &'static str,
    contact: &'static str,
}

const STORES: &[StoreSeed] = &[
    StoreSeed {
        name: "Lotte Duty Free Seoul",
        category: StoreCategory::DutyFree,
        description: "Premium duty-free shopping in downtown Seoul",
        address: "30 Eulji-ro, Jung-gu, Seoul",
        latitude: 37.5665,
        longitude: 126.9780,
        point_rate: 10.0,
        opening_hours: "09:30 - 21:00",
        contact: "+82-2-759-6500",
    },
    StoreSeed {
        name: "Shilla Duty Free",
        category: StoreCategory::DutyFree,
        description: "Luxury brands and Korean cosmetics",
        address: "249 Dongho-ro, Jung-gu, Seoul",
        latitude: 37.5547,
        longitude: 127.0015,
        point_rate: 10.0,
        opening_hours: "09:30 - 21:00",
        contact: "+82-2-2230-3000",
    },
    StoreSeed {
        name: "Myeongdong Shopping Street",
        category: StoreCategory::Retail,
        description: "Famous shopping district with cosmetics and fashion",
        address: "Myeongdong, Jung-gu, Seoul",
        latitude: 37.5636,
        longitude: 126.9844,
        point_rate: 5.0,
        opening_hours: "10:00 - 22:00",
        contact: "N/A",
    },
    StoreSeed {
        name: "N Seoul Tower",
        category: StoreCategory::Culture,
        description: "Iconic landmark with observation deck",
        address: "105 Namsangongwon-gil, Yongsan-gu, Seoul",
        latitude: 37.5512,
        longitude: 126.9882,
        point_rate: 15.0,
        opening_hours: "10:00 - 23:00",
        contact: "+82-2-3455-9277",
    },
];

struct MissionSeed {
    title: &'static str,
    description: &'static str,
    points: i64,
    kind: MissionType,
    requirements: &'static [&'static str],
    max_progress: u32,
    requires_photo: bool,
}

const MISSIONS: &[MissionSeed] = &[
    MissionSeed {
        title: "Use Public Transportation",
        description: "Take subway or bus 3 times today",
        points: 50,
        kind: MissionType::Daily,
        requirements: &["Tap a T-money card on the subway or a bus"],
        max_progress: 3,
        requires_photo: false,
    },
    MissionSeed {
        title: "Reusable Cup Challenge",
        description: "Use your reusable cup at a cafe",
        points: 30,
        kind: MissionType::Daily,
        requirements: &["Photo of your reusable cup at a partner cafe"],
        max_progress: 1,
        requires_photo: true,
    },
    MissionSeed {
        title: "Visit 3 Cultural Sites",
        description: "Explore Korean cultural heritage sites",
        points: 100,
        kind: MissionType::Weekly,
        requirements: &["Visit a palace, museum or heritage village"],
        max_progress: 3,
        requires_photo: false,
    },
    MissionSeed {
        title: "Hanbok Day",
        description: "Wear a hanbok while visiting Gyeongbokgung Palace",
        points: 200,
        kind: MissionType::Special,
        requirements: &["Photo in hanbok at the palace grounds"],
        max_progress: 1,
        requires_photo: true,
    },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub stores: usize,
    pub missions: usize,
}

/// Inserts the catalogue into empty tables; populated tables are left alone.
pub fn seed_catalog(db: &Database) -> Result<SeedReport> {
    let report = db.transact(|tx| {
        let now = Utc::now();
        let mut report = SeedReport::default();

        if tx.tables().stores.is_empty() {
            for seed in STORES {
                tx.put(PartnerStore {
                    id: Uuid::new_v4(),
                    name: seed.name.to_string(),
                    category: seed.category,
                    description: Some(seed.description.to_string()),
                    address: seed.address.to_string(),
                    latitude: seed.latitude,
                    longitude: seed.longitude,
                    point_rate: seed.point_rate,
                    images: Vec::new(),
                    opening_hours: Some(seed.opening_hours.to_string()),
                    contact: Some(seed.contact.to_string()),
                    created_at: now,
                });
                report.stores += 1;
            }
        }

        if tx.tables().missions.is_empty() {
            for seed in MISSIONS {
                tx.put(Mission {
                    id: Uuid::new_v4(),
                    title: seed.title.to_string(),
                    description: seed.description.to_string(),
                    points: seed.points,
                    kind: seed.kind,
                    requirements: seed.requirements.iter().map(|r| r.to_string()).collect(),
                    max_progress: seed.max_progress,
                    requires_photo: seed.requires_photo,
                    expires_at: None,
                    created_at: now,
                });
                report.missions += 1;
            }
        }

        Ok(report)
    })?;

    if report.stores + report.missions > 0 {
        info!(
            stores = report.stores,
            missions = report.missions,
            "seeded catalogue"
        );
    }
    Ok(report)
}
