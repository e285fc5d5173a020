//! # Persistence Format
//!
//! Binary serialization for progression snapshots.
//!
//! File I/O lives with the snapshot stores; this module only turns a
//! `Snapshot` into bytes and back.
//!
//! Format: Header (5 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("QLSN")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use super::Snapshot;
use crate::primitives;
use crate::types::QuestlineError;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted snapshot size.
///
/// A snapshot holds at most a bounded history and a fixed metric set, so
/// anything larger is corrupt.
pub const MAX_SNAPSHOT_SIZE: usize = 16 * 1024 * 1024; // 16 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes all snapshot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), QuestlineError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(QuestlineError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(QuestlineError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, QuestlineError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(QuestlineError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a snapshot to bytes (header + payload).
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, QuestlineError> {
    let header = PersistenceHeader::new();
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| QuestlineError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot from bytes.
///
/// Rejects input that is too short, larger than `MAX_SNAPSHOT_SIZE`, or
/// carries the wrong magic or version, before touching the payload.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, QuestlineError> {
    if bytes.len() < HEADER_SIZE {
        return Err(QuestlineError::DeserializationError(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(QuestlineError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        QuestlineError::DeserializationError(format!("Failed to decode snapshot: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
