//! # Core Type Definitions
//!
//! This module contains the shared types of the Questline progression engine:
//! - XP bookkeeping (`XpSource`, `XpEvent`)
//! - The unlocked badge ledger (`UnlockedBadges`)
//! - Error types (`QuestlineError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Use `BTreeMap` for deterministic ordering
//! - Use saturating arithmetic for counters to prevent overflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// XP SOURCES
// =============================================================================

/// Where an XP award came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpSource {
    Lesson,
    Quiz,
    DailyLogin,
    StreakBonus,
    Badge,
    Achievement,
    Challenge,
}

impl XpSource {
    /// Every source, in declaration order.
    pub const ALL: [XpSource; 7] = [
        XpSource::Lesson,
        XpSource::Quiz,
        XpSource::DailyLogin,
        XpSource::StreakBonus,
        XpSource::Badge,
        XpSource::Achievement,
        XpSource::Challenge,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            XpSource::Lesson => "lesson",
            XpSource::Quiz => "quiz",
            XpSource::DailyLogin => "daily_login",
            XpSource::StreakBonus => "streak_bonus",
            XpSource::Badge => "badge",
            XpSource::Achievement => "achievement",
            XpSource::Challenge => "challenge",
        }
    }

    /// Whether awards from this source are scaled by the streak bonus.
    ///
    /// Streak bonuses never compound on themselves, and badge/login rewards
    /// follow their own fixed tables.
    #[must_use]
    pub fn receives_streak_bonus(&self) -> bool {
        matches!(
            self,
            XpSource::Lesson | XpSource::Quiz | XpSource::Achievement | XpSource::Challenge
        )
    }

    /// Whether this source represents learning activity that extends the streak.
    #[must_use]
    pub fn counts_as_activity(&self) -> bool {
        matches!(
            self,
            XpSource::Lesson | XpSource::Quiz | XpSource::Challenge | XpSource::DailyLogin
        )
    }
}

impl std::fmt::Display for XpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for XpSource {
    type Err = QuestlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        XpSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| QuestlineError::InvalidInput(format!("unknown XP source: {s}")))
    }
}

// =============================================================================
// XP EVENT
// =============================================================================

/// One committed XP award. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEvent {
    pub amount: u64,
    pub source: XpSource,
    pub lesson_id: Option<String>,
    pub course_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl XpEvent {
    /// Create an event without lesson or course attribution.
    #[must_use]
    pub fn new(amount: u64, source: XpSource, timestamp: DateTime<Utc>) -> Self {
        Self {
            amount,
            source,
            lesson_id: None,
            course_id: None,
            timestamp,
        }
    }
}

// =============================================================================
// UNLOCKED BADGES
// =============================================================================

/// Ledger of unlocked badge ids and when they were unlocked.
///
/// Only grows: there is no removal operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedBadges(BTreeMap<String, DateTime<Utc>>);

impl UnlockedBadges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unlock. Returns `false` (and keeps the original timestamp)
    /// if the badge was already unlocked.
    pub fn insert(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        if self.0.contains_key(id) {
            return false;
        }
        self.0.insert(id.to_string(), at);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// When the badge was unlocked, if it was.
    #[must_use]
    pub fn unlocked_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.0.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unlocked ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(id, unlocked_at)` pairs in sorted id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.0.iter().map(|(id, at)| (id.as_str(), *at))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur at the edges of the Questline engine.
///
/// Rule evaluation itself never fails: invalid input is clamped and
/// unavailable operations return `false`. These errors come from
/// persistence, snapshot decoding and configuration.
#[derive(Debug, Error)]
pub enum QuestlineError {
    /// Host-provided input could not be interpreted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// The snapshot storage backend failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn source_names_roundtrip() {
        for source in XpSource::ALL {
            let parsed: XpSource = source.as_str().parse().expect("parse");
            assert_eq!(parsed, source);
        }
        assert!("homework".parse::<XpSource>().is_err());
    }

    #[test]
    fn streak_bonus_sources() {
        assert!(XpSource::Lesson.receives_streak_bonus());
        assert!(!XpSource::StreakBonus.receives_streak_bonus());
        assert!(!XpSource::Badge.receives_streak_bonus());
        assert!(!XpSource::DailyLogin.receives_streak_bonus());
    }

    #[test]
    fn unlocked_badges_keep_first_timestamp() {
        let mut badges = UnlockedBadges::new();
        assert!(badges.insert("first_lesson", at(10)));
        assert!(!badges.insert("first_lesson", at(20)));
        assert_eq!(badges.len(), 1);
        assert_eq!(badges.unlocked_at("first_lesson"), Some(at(10)));
    }

    #[test]
    fn unlocked_badges_sorted_ids() {
        let mut badges = UnlockedBadges::new();
        badges.insert("b", at(1));
        badges.insert("a", at(2));
        let ids: Vec<_> = badges.ids().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
