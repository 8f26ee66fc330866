//! Record store: in-memory tables behind a lock, transactional writes with
//! an undo log, optional WAL + snapshot persistence.

pub mod persistence;
pub mod tables;

pub use persistence::{DurabilityMode, PersistenceManager, SnapshotMetadata, WalEntry, WalOp};
pub use tables::{Keyed, Record, RecordKey, Tables};

use std::path::Path;
use std::sync::{Mutex, RwLock};

use tracing::{info, warn};

use crate::error::Result;

/// Shared database handle
pub struct Database {
    tables: RwLock<Tables>,
    persistence: Option<Mutex<PersistenceManager>>,
}

impl Database {
    /// Volatile store; everything is lost on drop
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            persistence: None,
        }
    }

    /// Opens (or creates) a persistent store in `data_dir`, recovering the
    /// last snapshot and replaying the WAL.
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        durability: DurabilityMode,
        checkpoint_threshold: usize,
    ) -> Result<Self> {
        let mut persistence = PersistenceManager::new(data_dir.as_ref(), durability)?;
        persistence
            .wal_mut()
            .set_checkpoint_threshold(checkpoint_threshold);

        let tables = match persistence.recover()? {
            Some(tables) => {
                info!(
                    data_dir = %data_dir.as_ref().display(),
                    records = tables.record_count(),
                    "recovered persisted state"
                );
                tables
            }
            None => Tables::default(),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            persistence: Some(Mutex::new(persistence)),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T> {
        let tables = self.tables.read()?;
        Ok(f(&tables))
    }

    /// Runs `f` under the write lock. On error every change made through the
    /// transaction is undone; on success the changes are logged as one WAL
    /// entry before the lock is released.
    pub fn transact<T>(&self, f: impl FnOnce(&mut Tx<'_>) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.write()?;
        let mut tx = Tx::new(&mut tables);

        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                tx.rollback();
                return Err(err);
            }
        };

        if tx.ops.is_empty() {
            return Ok(value);
        }

        if let Some(persistence) = &self.persistence {
            let mut persistence = persistence.lock()?;
            let entry = WalEntry::new(std::mem::take(&mut tx.ops));
            if let Err(err) = persistence.log(&entry) {
                tx.rollback();
                return Err(err);
            }

            drop(tx);
            if persistence.needs_checkpoint() {
                if let Err(err) = persistence.checkpoint(&tables) {
                    // The WAL still holds every entry; the next checkpoint retries
                    warn!(error = %err, "automatic checkpoint failed");
                }
            }
        }

        Ok(value)
    }

    /// Writes a snapshot and truncates the WAL. No-op for in-memory stores.
    pub fn checkpoint(&self) -> Result<Option<SnapshotMetadata>> {
        let Some(persistence) = &self.persistence else {
            return Ok(None);
        };
        let tables = self.tables.read()?;
        let mut persistence = persistence.lock()?;
        persistence.checkpoint(&tables).map(Some)
    }
}

/// Write access to the tables inside [`Database::transact`]
pub struct Tx<'a> {
    tables: &'a mut Tables,
    undo: Vec<(RecordKey, Option<Record>)>,
    ops: Vec<WalOp>,
}

impl<'a> Tx<'a> {
    fn new(tables: &'a mut Tables) -> Self {
        Self {
            tables,
            undo: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn tables(&self) -> &Tables {
        self.tables
    }

    pub fn put(&mut self, record: impl Into<Record>) {
        let record = record.into();
        let key = record.key();
        let previous = self.tables.put(record.clone());
        self.undo.push((key, previous));
        self.ops.push(WalOp::Put(record));
    }

    pub fn delete(&mut self, key: RecordKey) -> Option<Record> {
        let removed = self.tables.delete(key);
        if removed.is_some() {
            self.undo.push((key, removed.clone()));
            self.ops.push(WalOp::Delete(key));
        }
        removed
    }

    fn rollback(&mut self) {
        while let Some((key, previous)) = self.undo.pop() {
            match previous {
                Some(record) => {
                    self.tables.put(record);
                }
                None => {
                    self.tables.delete(key);
                }
            }
        }
        self.ops.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OmniError;
    use crate::models::{PointBalance, StoreCategory, PartnerStore};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn store(name: &str) -> PartnerStore {
        PartnerStore {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: StoreCategory::Culture,
            description: None,
            address: "Jongno-gu, Seoul".to_string(),
            latitude: 37.5796,
            longitude: 126.9770,
            point_rate: 1.0,
            images: vec![],
            opening_hours: None,
            contact: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = Database::in_memory();
        let user_id = Uuid::new_v4();
        db.transact(|tx| {
            tx.put(PointBalance::empty(user_id, Utc::now()));
            Ok(())
        })
        .unwrap();

        let result: Result<()> = db.transact(|tx| {
            let mut balance = tx.tables().balances[&user_id].clone();
            balance.balance = 500;
            tx.put(balance);
            tx.put(store("Gyeongbokgung"));
            Err(OmniError::validation("abort"))
        });
        assert!(result.is_err());

        db.read(|tables| {
            assert_eq!(tables.balance_of(user_id), 0);
            assert!(tables.stores.is_empty());
        })
        .unwrap();
    }

    #[test]
    fn test_persistent_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let kept = store("National Museum");
        {
            let db = Database::open(temp_dir.path(), DurabilityMode::Sync, 1000).unwrap();
            db.transact(|tx| {
                tx.put(kept.clone());
                tx.put(store("Temporary"));
                Ok(())
            })
            .unwrap();
            db.transact(|tx| {
                let temporary = tx
                    .tables()
                    .stores
                    .values()
                    .find(|s| s.name == "Temporary")
                    .map(|s| s.id)
                    .unwrap();
                tx.delete(RecordKey::Store(temporary));
                Ok(())
            })
            .unwrap();
        }

        let reopened = Database::open(temp_dir.path(), DurabilityMode::Sync, 1000).unwrap();
        reopened
            .read(|tables| {
                assert_eq!(tables.stores.len(), 1);
                assert_eq!(tables.stores[&kept.id].name, "National Museum");
            })
            .unwrap();
    }

    #[test]
    fn test_automatic_checkpoint() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path(), DurabilityMode::Async, 2).unwrap();
        for name in ["a", "b", "c"] {
            db.transact(|tx| {
                tx.put(store(name));
                Ok(())
            })
            .unwrap();
        }
        drop(db);

        let reopened = Database::open(temp_dir.path(), DurabilityMode::Async, 2).unwrap();
        assert_eq!(reopened.read(|t| t.stores.len()).unwrap(), 3);
    }
}
