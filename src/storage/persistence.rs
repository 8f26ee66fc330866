//! Write-Ahead Logging (WAL) and snapshot persistence for the record store

use crate::error::{OmniError, Result};
use crate::storage::tables::{Record, RecordKey, Tables};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

pub const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// WAL Entry Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalOp {
    Put(Record),
    Delete(RecordKey),
}

/// One committed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub committed_at: i64,
    pub ops: Vec<WalOp>,
}

impl WalEntry {
    pub fn new(ops: Vec<WalOp>) -> Self {
        Self {
            committed_at: chrono::Utc::now().timestamp_millis(),
            ops,
        }
    }

    pub fn apply(self, tables: &mut Tables) {
        for op in self.ops {
            match op {
                WalOp::Put(record) => {
                    tables.put(record);
                }
                WalOp::Delete(key) => {
                    tables.delete(key);
                }
            }
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: i64,
    pub record_count: usize,
    pub user_count: usize,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    metadata: SnapshotMetadata,
    tables: &'a Tables,
}

#[derive(Debug, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub metadata: SnapshotMetadata,
    pub tables: Tables,
}

fn snapshot_metadata(tables: &Tables) -> SnapshotMetadata {
    SnapshotMetadata {
        created_at: chrono::Utc::now().timestamp_millis(),
        record_count: tables.record_count(),
        user_count: tables.users.len(),
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every commit
    Sync,
    /// flush to the OS after every commit
    #[default]
    Async,
    /// no WAL; only explicit checkpoints reach disk
    None,
}

impl std::str::FromStr for DurabilityMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown durability mode '{other}'")),
        }
    }
}

// ============================================================================
// WAL Manager
// ============================================================================

pub struct WalManager {
    wal_path: PathBuf,
    /// Unbuffered; a failed append leaves nothing queued
    wal_file: Option<File>,
    durability_mode: DurabilityMode,
    entries_since_checkpoint: usize,
    checkpoint_threshold: usize,
}

impl WalManager {
    pub fn new<P: AsRef<Path>>(wal_path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let wal_path = wal_path.as_ref().to_path_buf();
        if let Some(parent) = wal_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| OmniError::storage(format!("Failed to create WAL directory: {}", e)))?;
        }

        let wal_file = if durability_mode != DurabilityMode::None {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&wal_path)
                .map_err(|e| OmniError::storage(format!("Failed to open WAL file: {}", e)))?;
            Some(file)
        } else {
            None
        };

        Ok(Self {
            wal_path,
            wal_file,
            durability_mode,
            entries_since_checkpoint: 0,
            checkpoint_threshold: 1000,
        })
    }

    /// Appends one length-prefixed frame. On failure the file is cut back to
    /// its previous length; if that fails too, appends stay disabled until
    /// `clear` recreates the file.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        let file = self
            .wal_file
            .as_mut()
            .ok_or_else(|| OmniError::storage("WAL is disabled until the next checkpoint"))?;

        let serialized = rmp_serde::to_vec_named(entry)?;
        let len = u32::try_from(serialized.len())
            .map_err(|_| OmniError::storage("WAL entry exceeds the frame size limit"))?;
        let mut frame = Vec::with_capacity(4 + serialized.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&serialized);

        let sync = self.durability_mode == DurabilityMode::Sync;
        match write_frame(file, &frame, sync) {
            Ok(()) => {
                self.entries_since_checkpoint += 1;
                Ok(())
            }
            Err(FrameError::RolledBack(e)) => {
                Err(OmniError::storage(format!("Failed to write WAL: {}", e)))
            }
            Err(FrameError::Torn { write, truncate }) => {
                error!(
                    path = %self.wal_path.display(),
                    error = %truncate,
                    "could not cut back a failed WAL append; WAL disabled"
                );
                self.wal_file = None;
                Err(OmniError::storage(format!("Failed to write WAL: {}", write)))
            }
        }
    }

    /// Reads every complete entry. A torn final entry (crash mid-append) is
    /// dropped with a warning.
    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        if !self.wal_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.wal_path)
            .map_err(|e| OmniError::storage(format!("Failed to open WAL for reading: {}", e)))?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(OmniError::storage(format!(
                        "Failed to read WAL entry length: {}",
                        e
                    )));
                }
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            match reader.read_exact(&mut data) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    warn!(
                        path = %self.wal_path.display(),
                        recovered = entries.len(),
                        "discarding torn WAL tail"
                    );
                    break;
                }
                Err(e) => {
                    return Err(OmniError::storage(format!(
                        "Failed to read WAL entry data: {}",
                        e
                    )));
                }
            }
            let entry: WalEntry = rmp_serde::from_slice(&data)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        self.wal_file = None;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.wal_path)
            .map_err(|e| OmniError::storage(format!("Failed to truncate WAL: {}", e)))?;
        drop(file);
        let file = OpenOptions::new()
            .append(true)
            .open(&self.wal_path)
            .map_err(|e| OmniError::storage(format!("Failed to reopen WAL: {}", e)))?;
        self.wal_file = Some(file);
        self.entries_since_checkpoint = 0;
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.entries_since_checkpoint >= self.checkpoint_threshold
    }

    pub fn entries_since_checkpoint(&self) -> usize {
        self.entries_since_checkpoint
    }

    pub fn set_checkpoint_threshold(&mut self, threshold: usize) {
        self.checkpoint_threshold = threshold.max(1);
    }
}

/// Append-only target of WAL frames
trait WalSink: Write {
    fn size(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl WalSink for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

#[derive(Debug)]
enum FrameError {
    /// The sink is back at its previous length
    RolledBack(io::Error),
    /// The sink may hold a partial frame
    Torn { write: io::Error, truncate: io::Error },
}

fn write_frame<S: WalSink>(
    sink: &mut S,
    frame: &[u8],
    sync: bool,
) -> std::result::Result<(), FrameError> {
    let start = sink.size().map_err(FrameError::RolledBack)?;
    let written = sink.write_all(frame).and_then(|()| {
        sink.flush()?;
        if sync { sink.sync() } else { Ok(()) }
    });
    match written {
        Ok(()) => Ok(()),
        Err(write) => match sink.truncate(start) {
            Ok(()) => Err(FrameError::RolledBack(write)),
            Err(truncate) => Err(FrameError::Torn { write, truncate }),
        },
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    /// Writes to a temporary file in the same directory, fsyncs it and
    /// renames it over the previous snapshot.
    pub fn save(&self, tables: &Tables) -> Result<SnapshotMetadata> {
        let dir = self
            .snapshot_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir).map_err(|e| {
            OmniError::storage(format!("Failed to create snapshot directory: {}", e))
        })?;

        let metadata = snapshot_metadata(tables);
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            metadata: metadata.clone(),
            tables,
        };
        let serialized = rmp_serde::to_vec_named(&snapshot)?;

        let mut temp = NamedTempFile::new_in(&dir)
            .map_err(|e| OmniError::storage(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(&serialized)
            .map_err(|e| OmniError::storage(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| OmniError::storage(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| OmniError::storage(format!("Failed to rename snapshot: {}", e)))?;
        Ok(metadata)
    }

    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.snapshot_path)
            .map_err(|e| OmniError::storage(format!("Failed to open snapshot: {}", e)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| OmniError::storage(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(OmniError::storage(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}

// ============================================================================
// Persistence Manager
// ============================================================================

pub struct PersistenceManager {
    wal: WalManager,
    snapshot: SnapshotManager,
}

impl PersistenceManager {
    pub fn new<P: AsRef<Path>>(data_dir: P, durability_mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let wal = WalManager::new(data_dir.join("omnipass.wal"), durability_mode)?;
        let snapshot = SnapshotManager::new(data_dir.join("omnipass.snapshot"));
        Ok(Self { wal, snapshot })
    }

    pub fn log(&mut self, entry: &WalEntry) -> Result<()> {
        self.wal.append(entry)
    }

    pub fn checkpoint(&mut self, tables: &Tables) -> Result<SnapshotMetadata> {
        let metadata = self.snapshot.save(tables)?;
        self.wal.clear()?;
        debug!(records = metadata.record_count, "checkpoint written");
        Ok(metadata)
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.wal.needs_checkpoint()
    }

    /// Snapshot first, then WAL entries in commit order.
    pub fn recover(&self) -> Result<Option<Tables>> {
        let snapshot = self.snapshot.load()?;
        let wal_entries = self.wal.read_all()?;
        if snapshot.is_none() && wal_entries.is_empty() {
            return Ok(None);
        }

        let mut tables = snapshot.map(|s| s.tables).unwrap_or_default();
        tables.rebuild_indexes();
        for entry in wal_entries {
            entry.apply(&mut tables);
        }
        Ok(Some(tables))
    }

    pub fn wal(&self) -> &WalManager {
        &self.wal
    }

    pub fn wal_mut(&mut self) -> &mut WalManager {
        &mut self.wal
    }

    pub fn snapshot(&self) -> &SnapshotManager {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StoreCategory, PartnerStore};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn store(name: &str) -> PartnerStore {
        PartnerStore {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: StoreCategory::DutyFree,
            description: None,
            address: "Seoul".to_string(),
            latitude: 37.5665,
            longitude: 126.9780,
            point_rate: 10.0,
            images: vec![],
            opening_hours: None,
            contact: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_wal_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut wal = WalManager::new(temp_dir.path().join("test.wal"), DurabilityMode::Sync).unwrap();
        wal.append(&WalEntry::new(vec![WalOp::Put(store("Lotte").into())])).unwrap();
        wal.append(&WalEntry::new(vec![WalOp::Delete(RecordKey::Store(Uuid::new_v4()))])).unwrap();
        let entries = wal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(wal.entries_since_checkpoint(), 2);
    }

    #[test]
    fn test_torn_tail_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.wal");
        let mut wal = WalManager::new(&path, DurabilityMode::Sync).unwrap();
        wal.append(&WalEntry::new(vec![WalOp::Put(store("Shilla").into())])).unwrap();
        drop(wal);

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&64u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        let wal = WalManager::new(&path, DurabilityMode::Sync).unwrap();
        assert_eq!(wal.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_checkpoint_clears_wal() {
        let temp_dir = TempDir::new().unwrap();
        let mut persistence = PersistenceManager::new(temp_dir.path(), DurabilityMode::Sync).unwrap();
        persistence.log(&WalEntry::new(vec![WalOp::Put(store("A").into())])).unwrap();
        assert_eq!(persistence.wal().entries_since_checkpoint(), 1);

        let tables = Tables::default();
        persistence.checkpoint(&tables).unwrap();
        assert_eq!(persistence.wal().entries_since_checkpoint(), 0);
        assert!(persistence.wal().read_all().unwrap().is_empty());
        assert!(persistence.snapshot().exists());
    }

    #[test]
    fn test_recovery_replays_wal_over_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let mut persistence = PersistenceManager::new(temp_dir.path(), DurabilityMode::Sync).unwrap();

        let first = store("Lotte Duty Free Seoul");
        let mut tables = Tables::default();
        tables.put(first.clone().into());
        persistence.checkpoint(&tables).unwrap();

        let second = store("Shilla Duty Free");
        persistence
            .log(&WalEntry::new(vec![
                WalOp::Put(second.clone().into()),
                WalOp::Delete(RecordKey::Store(first.id)),
            ]))
            .unwrap();

        let recovered = persistence.recover().unwrap().unwrap();
        assert_eq!(recovered.stores.len(), 1);
        assert!(recovered.stores.contains_key(&second.id));
    }

    /// In-memory sink that accepts `budget` more bytes before failing
    struct FlakySink {
        bytes: Vec<u8>,
        budget: usize,
        truncate_fails: bool,
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::other("no space left on device"));
            }
            let n = buf.len().min(self.budget);
            self.bytes.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl WalSink for FlakySink {
        fn size(&self) -> io::Result<u64> {
            Ok(self.bytes.len() as u64)
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.truncate_fails {
                return Err(io::Error::other("read-only file system"));
            }
            self.bytes.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_frame_is_cut_back() {
        let mut sink = FlakySink {
            bytes: Vec::new(),
            budget: 10,
            truncate_fails: false,
        };
        write_frame(&mut sink, b"first", false).unwrap();

        // Only part of the frame fits
        let result = write_frame(&mut sink, b"second frame", true);
        assert!(matches!(result, Err(FrameError::RolledBack(_))));
        assert_eq!(sink.bytes, b"first");

        sink.budget = 64;
        write_frame(&mut sink, b"third", false).unwrap();
        assert_eq!(sink.bytes, b"firstthird");
    }

    #[test]
    fn test_failed_cut_back_reports_torn_frame() {
        let mut sink = FlakySink {
            bytes: b"ok".to_vec(),
            budget: 3,
            truncate_fails: true,
        };
        let result = write_frame(&mut sink, b"payload", false);
        assert!(matches!(result, Err(FrameError::Torn { .. })));
    }

    #[test]
    fn test_unwritable_wal_is_disabled_until_cleared() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.wal");
        let mut wal = WalManager::new(&path, DurabilityMode::Sync).unwrap();
        wal.append(&WalEntry::new(vec![WalOp::Put(store("Lotte").into())])).unwrap();
        let size = fs::metadata(&path).unwrap().len();

        // A read-only handle fails both the write and the cut back
        wal.wal_file = Some(File::open(&path).unwrap());
        let entry = WalEntry::new(vec![WalOp::Put(store("Shilla").into())]);
        assert!(wal.append(&entry).is_err());
        assert!(wal.wal_file.is_none());
        assert!(wal.append(&entry).is_err());
        assert_eq!(fs::metadata(&path).unwrap().len(), size);
        assert_eq!(wal.read_all().unwrap().len(), 1);
        assert_eq!(wal.entries_since_checkpoint(), 1);

        wal.clear().unwrap();
        wal.append(&entry).unwrap();
        assert_eq!(wal.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_recover_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = PersistenceManager::new(temp_dir.path(), DurabilityMode::Async).unwrap();
        assert!(persistence.recover().unwrap().is_none());
    }
}
