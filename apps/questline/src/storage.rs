//! # Storage Backends
//!
//! Opens the snapshot store selected by `[storage]`.

use crate::config::{Backend, StorageConfig};
use questline_core::formats::MAX_SNAPSHOT_SIZE;
use questline_core::{
    QuestlineError, RedbSnapshotStore, Snapshot, SnapshotStore, snapshot_from_bytes,
    snapshot_to_bytes,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE BACKEND
// =============================================================================

/// Keeps one binary snapshot in a plain file.
///
/// Saves write a sibling temporary file and rename it over the target, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, QuestlineError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let metadata = std::fs::metadata(&self.path)
            .map_err(|e| QuestlineError::IoError(format!("Cannot read file metadata: {}", e)))?;
        if metadata.len() > MAX_SNAPSHOT_SIZE as u64 {
            return Err(QuestlineError::DeserializationError(format!(
                "File size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_SNAPSHOT_SIZE
            )));
        }

        let data = std::fs::read(&self.path)
            .map_err(|e| QuestlineError::IoError(format!("Read snapshot: {}", e)))?;
        snapshot_from_bytes(&data).map(Some)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), QuestlineError> {
        let data = snapshot_to_bytes(snapshot)?;
        let temp = self.temp_path();
        std::fs::write(&temp, &data)
            .map_err(|e| QuestlineError::IoError(format!("Write snapshot: {}", e)))?;
        std::fs::rename(&temp, &self.path)
            .map_err(|e| QuestlineError::IoError(format!("Replace snapshot: {}", e)))?;
        Ok(())
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Open the configured backend.
pub fn open_store(storage: &StorageConfig) -> Result<Box<dyn SnapshotStore>, QuestlineError> {
    match storage.backend {
        Backend::Redb => Ok(Box::new(RedbSnapshotStore::open(&storage.path)?)),
        Backend::File => Ok(Box::new(FileSnapshotStore::new(&storage.path))),
    }
}
