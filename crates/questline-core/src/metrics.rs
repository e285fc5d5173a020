//! # User Metrics
//!
//! The named counters badge criteria are evaluated against.
//!
//! Keys form a closed set (`MetricKey`). Counter keys hold a number; event-log
//! keys hold timestamps and evaluate to how many events were logged. A key that
//! was never written evaluates to 0, and so does any name that is not a known
//! key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a metric stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    EventLog,
}

/// Every metric the badge catalog may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    LessonsCompleted,
    QuizzesCompleted,
    PerfectQuizzes,
    CoursesCompleted,
    TotalXp,
    Level,
    CurrentStreak,
    LongestStreak,
    DailyLogins,
    BadgesUnlocked,
    FreezesUsed,
    /// Fastest lesson completion in seconds (lower is better).
    FastestLessonSeconds,
    /// Fastest quiz completion in seconds (lower is better).
    FastestQuizSeconds,
    /// Timestamps of sessions started late at night.
    NightSessions,
    /// Timestamps of sessions started early in the morning.
    EarlySessions,
}

impl MetricKey {
    pub const ALL: [MetricKey; 15] = [
        MetricKey::LessonsCompleted,
        MetricKey::QuizzesCompleted,
        MetricKey::PerfectQuizzes,
        MetricKey::CoursesCompleted,
        MetricKey::TotalXp,
        MetricKey::Level,
        MetricKey::CurrentStreak,
        MetricKey::LongestStreak,
        MetricKey::DailyLogins,
        MetricKey::BadgesUnlocked,
        MetricKey::FreezesUsed,
        MetricKey::FastestLessonSeconds,
        MetricKey::FastestQuizSeconds,
        MetricKey::NightSessions,
        MetricKey::EarlySessions,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::LessonsCompleted => "lessons_completed",
            MetricKey::QuizzesCompleted => "quizzes_completed",
            MetricKey::PerfectQuizzes => "perfect_quizzes",
            MetricKey::CoursesCompleted => "courses_completed",
            MetricKey::TotalXp => "total_xp",
            MetricKey::Level => "level",
            MetricKey::CurrentStreak => "current_streak",
            MetricKey::LongestStreak => "longest_streak",
            MetricKey::DailyLogins => "daily_logins",
            MetricKey::BadgesUnlocked => "badges_unlocked",
            MetricKey::FreezesUsed => "freezes_used",
            MetricKey::FastestLessonSeconds => "fastest_lesson_seconds",
            MetricKey::FastestQuizSeconds => "fastest_quiz_seconds",
            MetricKey::NightSessions => "night_sessions",
            MetricKey::EarlySessions => "early_sessions",
        }
    }

    /// Parse a metric name. Unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<MetricKey> {
        MetricKey::ALL.into_iter().find(|key| key.as_str() == name)
    }

    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricKey::NightSessions | MetricKey::EarlySessions => MetricKind::EventLog,
            _ => MetricKind::Counter,
        }
    }

    /// Metrics the store maintains itself from its own state.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            MetricKey::TotalXp
                | MetricKey::Level
                | MetricKey::CurrentStreak
                | MetricKey::LongestStreak
                | MetricKey::BadgesUnlocked
        )
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change to the metrics map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MetricUpdate {
    /// Overwrite a counter.
    Set { key: MetricKey, value: u64 },
    /// Add to a counter.
    Increment { key: MetricKey, by: u64 },
    /// Keep the smaller of the stored and given value (for best times).
    Best { key: MetricKey, value: u64 },
    /// Append a timestamp to an event log.
    Record { key: MetricKey, at: DateTime<Utc> },
}

impl MetricUpdate {
    /// The metric this update writes.
    #[must_use]
    pub fn key(&self) -> MetricKey {
        match *self {
            MetricUpdate::Set { key, .. }
            | MetricUpdate::Increment { key, .. }
            | MetricUpdate::Best { key, .. }
            | MetricUpdate::Record { key, .. } => key,
        }
    }
}

/// Snapshot of the learner's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetrics {
    counters: BTreeMap<MetricKey, u64>,
    events: BTreeMap<MetricKey, Vec<DateTime<Utc>>>,
}

impl UserMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a metric. Event logs evaluate to their length; absent keys to 0.
    #[must_use]
    pub fn value(&self, key: MetricKey) -> u64 {
        match key.kind() {
            MetricKind::Counter => self.counters.get(&key).copied().unwrap_or(0),
            MetricKind::EventLog => self.events.get(&key).map_or(0, |log| log.len() as u64),
        }
    }

    /// Value of a metric by name. Names outside `MetricKey` evaluate to 0.
    #[must_use]
    pub fn value_by_name(&self, name: &str) -> u64 {
        match MetricKey::from_name(name) {
            Some(key) => self.value(key),
            None => {
                tracing::debug!(metric = name, "unknown metric evaluates to 0");
                0
            }
        }
    }

    /// Logged events for an event-log metric.
    #[must_use]
    pub fn events(&self, key: MetricKey) -> &[DateTime<Utc>] {
        self.events.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Apply one update. Counter operations on event-log keys append nothing
    /// and are ignored, as are `Record` operations on counter keys.
    pub fn apply(&mut self, update: &MetricUpdate) {
        match *update {
            MetricUpdate::Set { key, value } if key.kind() == MetricKind::Counter => {
                self.counters.insert(key, value);
            }
            MetricUpdate::Increment { key, by } if key.kind() == MetricKind::Counter => {
                let entry = self.counters.entry(key).or_insert(0);
                *entry = entry.saturating_add(by);
            }
            MetricUpdate::Best { key, value } if key.kind() == MetricKind::Counter => {
                if value == 0 {
                    return;
                }
                let entry = self.counters.entry(key).or_insert(value);
                *entry = (*entry).min(value);
            }
            MetricUpdate::Record { key, at } if key.kind() == MetricKind::EventLog => {
                self.events.entry(key).or_default().push(at);
            }
            _ => {
                tracing::debug!(?update, "metric update does not match metric kind");
            }
        }
    }

    /// Shorthand for `Set`.
    pub fn set(&mut self, key: MetricKey, value: u64) {
        self.apply(&MetricUpdate::Set { key, value });
    }

    /// Shorthand for `Increment`.
    pub fn increment(&mut self, key: MetricKey, by: u64) {
        self.apply(&MetricUpdate::Increment { key, by });
    }

    /// Metrics with a non-zero value, in key order.
    pub fn non_zero(&self) -> impl Iterator<Item = (MetricKey, u64)> + '_ {
        MetricKey::ALL
            .into_iter()
            .map(|key| (key, self.value(key)))
            .filter(|(_, value)| *value > 0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
