//! # redb-backed Snapshot Storage
//!
//! Stores the encoded snapshot in a redb embedded database, giving crash-safe
//! replacement of the previous snapshot (copy-on-write B-trees, ACID commits).
//!
//! The snapshot is kept under a single key in the `snapshots` table, encoded
//! with the binary persistence format. A `metadata` table counts saves.

use super::SnapshotStore;
use crate::formats::{Snapshot, snapshot_from_bytes, snapshot_to_bytes};
use crate::types::QuestlineError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for snapshots: slot name -> encoded snapshot bytes
const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const CURRENT: &str = "current";
const SAVE_COUNT: &str = "save_count";

fn storage_err(e: impl std::fmt::Display) -> QuestlineError {
    QuestlineError::StorageError(e.to_string())
}

/// A disk-backed snapshot store using redb.
pub struct RedbSnapshotStore {
    db: Database,
}

impl std::fmt::Debug for RedbSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbSnapshotStore").finish_non_exhaustive()
    }
}

impl RedbSnapshotStore {
    /// Open or create a snapshot database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QuestlineError> {
        let db = Database::create(path.as_ref()).map_err(|e| QuestlineError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(SNAPSHOTS).map_err(storage_err)?;
            let _ = write_txn.open_table(METADATA).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db })
    }

    /// Number of snapshots written to this database.
    pub fn save_count(&self) -> Result<u64, QuestlineError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(METADATA).map_err(storage_err)?;
        Ok(table
            .get(SAVE_COUNT)
            .map_err(storage_err)?
            .map(|v| v.value())
            .unwrap_or(0))
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), QuestlineError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }
}

impl SnapshotStore for RedbSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, QuestlineError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(SNAPSHOTS).map_err(storage_err)?;
        let Some(bytes) = table.get(CURRENT).map_err(storage_err)? else {
            return Ok(None);
        };
        snapshot_from_bytes(bytes.value()).map(Some)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), QuestlineError> {
        let bytes = snapshot_to_bytes(snapshot)?;

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut snapshots = write_txn.open_table(SNAPSHOTS).map_err(storage_err)?;
            snapshots
                .insert(CURRENT, bytes.as_slice())
                .map_err(storage_err)?;

            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            let count = meta
                .get(SAVE_COUNT)
                .map_err(storage_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            meta.insert(SAVE_COUNT, count.saturating_add(1))
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        tracing::debug!(bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn snapshot(total_xp: u64) -> Snapshot {
        let at = Utc.timestamp_opt(1_780_000_000, 0).single().expect("ts");
        let mut snapshot = Snapshot::empty(at);
        snapshot.total_xp = total_xp;
        snapshot
    }

    #[test]
    fn empty_database_loads_none() {
        let dir = TempDir::new().expect("tempdir");
        let store = RedbSnapshotStore::open(dir.path().join("progress.redb")).expect("open");
        assert!(store.load().expect("load").is_none());
        assert_eq!(store.save_count().expect("count"), 0);
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = RedbSnapshotStore::open(dir.path().join("progress.redb")).expect("open");

        store.save(&snapshot(10)).expect("save");
        store.save(&snapshot(250)).expect("save");

        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded.total_xp, 250);
        assert_eq!(store.save_count().expect("count"), 2);
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("progress.redb");
        {
            let mut store = RedbSnapshotStore::open(&path).expect("open");
            store.save(&snapshot(99)).expect("save");
        }
        let store = RedbSnapshotStore::open(&path).expect("reopen");
        assert_eq!(store.load().expect("load").map(|s| s.total_xp), Some(99));
    }
}
