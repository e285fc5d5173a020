//! # Snapshot
//!
//! The persisted subset of progression state.
//!
//! Level, in-level XP, XP to next level and progress percent are derived from
//! `total_xp` and are never stored; they are recomputed on restore so a change
//! to the level curve cannot drift from stored values.

use crate::metrics::UserMetrics;
use crate::primitives::FORMAT_VERSION;
use crate::types::XpEvent;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable progression snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version the snapshot was written with.
    pub version: u8,
    pub total_xp: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub streak_freezes: u32,
    pub freeze_active_date: Option<NaiveDate>,
    /// Unlocked badge ids, sorted.
    pub unlocked_badges: Vec<String>,
    /// Unlock time per badge id.
    pub badge_unlocked_at: BTreeMap<String, DateTime<Utc>>,
    /// Most recent first.
    pub xp_history: Vec<XpEvent>,
    pub metrics: UserMetrics,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// An empty snapshot for a brand new learner.
    #[must_use]
    pub fn empty(updated_at: DateTime<Utc>) -> Self {
        Self {
            version: FORMAT_VERSION,
            total_xp: 0,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            streak_freezes: 0,
            freeze_active_date: None,
            unlocked_badges: Vec::new(),
            badge_unlocked_at: BTreeMap::new(),
            xp_history: Vec::new(),
            metrics: UserMetrics::new(),
            updated_at,
        }
    }
}
