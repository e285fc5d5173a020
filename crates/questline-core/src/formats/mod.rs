//! # Formats
//!
//! The persisted snapshot and its binary encoding.

mod persistence;
mod snapshot;

pub use persistence::{
    MAX_SNAPSHOT_SIZE, PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes,
};
pub use snapshot::Snapshot;
