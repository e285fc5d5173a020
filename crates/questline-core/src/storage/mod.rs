//! # Snapshot Storage
//!
//! The persistence seam of the engine. A `ProgressionStore` loads one
//! snapshot at session start and saves one after every mutation.
//!
//! Backends:
//! - `MemorySnapshotStore`: volatile, for tests and embedding
//! - `RedbSnapshotStore`: disk-backed ACID storage using redb

mod redb_snapshot;

pub use redb_snapshot::RedbSnapshotStore;

use crate::formats::Snapshot;
use crate::types::QuestlineError;

/// Where snapshots are read from and written to.
pub trait SnapshotStore: Send {
    /// Load the latest snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>, QuestlineError>;

    /// Replace the stored snapshot.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), QuestlineError>;
}

/// Keeps the latest snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshot: Option<Snapshot>,
    saves: u64,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing snapshot.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            saves: 0,
        }
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.saves
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, QuestlineError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), QuestlineError> {
        self.snapshot = Some(snapshot.clone());
        self.saves = self.saves.saturating_add(1);
        Ok(())
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn load(&self) -> Result<Option<Snapshot>, QuestlineError> {
        (**self).load()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), QuestlineError> {
        (**self).save(snapshot)
    }
}
