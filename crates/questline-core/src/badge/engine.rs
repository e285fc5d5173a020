//! Unlock detection and progress reporting.
//!
//! The engine is stateless: it reads the catalog, a `UserMetrics` snapshot and
//! the ledger of unlocked badges, and returns descriptions of what changed.
//! The store decides whether to commit them.

use super::{BADGES, BadgeDefinition, Criteria};
use crate::metrics::UserMetrics;
use crate::types::UnlockedBadges;
use chrono::{DateTime, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

// =============================================================================
// ACTIVITY KINDS
// =============================================================================

/// The kind of activity that just happened, used to narrow unlock checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Lesson,
    Quiz,
    DailyLogin,
    Streak,
    XpEarned,
    BadgeUnlocked,
    Session,
}

impl ActivityKind {
    /// Metric-name fragments an activity of this kind can move.
    ///
    /// A badge is checked when any metric its criteria reads contains one of
    /// these fragments.
    #[must_use]
    pub const fn metric_fragments(&self) -> &'static [&'static str] {
        match self {
            ActivityKind::Lesson => &["lesson", "course"],
            ActivityKind::Quiz => &["quiz"],
            ActivityKind::DailyLogin => &["login", "streak"],
            ActivityKind::Streak => &["streak", "freeze"],
            ActivityKind::XpEarned => &["xp", "level"],
            ActivityKind::BadgeUnlocked => &["badge"],
            ActivityKind::Session => &["session"],
        }
    }

    fn touches(&self, criteria: &Criteria) -> bool {
        let fragments = self.metric_fragments();
        criteria
            .metrics()
            .iter()
            .any(|metric| fragments.iter().any(|f| metric.as_str().contains(f)))
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// A badge that became unlockable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeUnlockResult {
    pub badge: &'static BadgeDefinition,
    pub unlocked_at: DateTime<Utc>,
    pub xp_reward: u64,
    pub is_first_unlock: bool,
}

/// Progress toward one badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeProgress {
    pub badge_id: &'static str,
    pub current_value: u64,
    pub target_value: u64,
    /// 0..=100.
    pub progress_percent: u8,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub hidden: bool,
}

/// A badge as listed to the learner.
///
/// `concealed` is set for hidden badges that are still locked; hosts render a
/// placeholder instead of the name and description. A concealed view
/// serializes its `badge` as `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeView {
    pub badge: &'static BadgeDefinition,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub hidden: bool,
    pub concealed: bool,
}

impl Serialize for BadgeView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let badge = (!self.concealed).then_some(self.badge);
        let mut view = serializer.serialize_struct("BadgeView", 5)?;
        view.serialize_field("badge", &badge)?;
        view.serialize_field("unlocked", &self.unlocked)?;
        view.serialize_field("unlocked_at", &self.unlocked_at)?;
        view.serialize_field("hidden", &self.hidden)?;
        view.serialize_field("concealed", &self.concealed)?;
        view.end()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Evaluates a static badge catalog.
#[derive(Debug, Clone, Copy)]
pub struct BadgeEngine {
    catalog: &'static [BadgeDefinition],
}

impl Default for BadgeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BadgeEngine {
    /// Engine over the built-in catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self { catalog: BADGES }
    }

    /// Engine over a custom catalog.
    #[must_use]
    pub const fn with_catalog(catalog: &'static [BadgeDefinition]) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &'static [BadgeDefinition] {
        self.catalog
    }

    #[must_use]
    pub fn find(&self, badge_id: &str) -> Option<&'static BadgeDefinition> {
        self.catalog.iter().find(|b| b.id == badge_id)
    }

    #[must_use]
    pub fn evaluate_criteria(&self, criteria: &Criteria, metrics: &UserMetrics) -> bool {
        criteria.is_satisfied(metrics)
    }

    /// Every locked badge whose criteria are now satisfied, in catalog order.
    #[must_use]
    pub fn check_all_unlocks(
        &self,
        metrics: &UserMetrics,
        unlocked: &UnlockedBadges,
        now: DateTime<Utc>,
    ) -> Vec<BadgeUnlockResult> {
        self.scan(metrics, unlocked, now, |_| true)
    }

    /// Like `check_all_unlocks`, restricted to badges whose criteria read a
    /// metric this kind of activity can move.
    #[must_use]
    pub fn check_unlocks_for_event(
        &self,
        kind: ActivityKind,
        metrics: &UserMetrics,
        unlocked: &UnlockedBadges,
        now: DateTime<Utc>,
    ) -> Vec<BadgeUnlockResult> {
        self.scan(metrics, unlocked, now, |badge| kind.touches(&badge.criteria))
    }

    fn scan(
        &self,
        metrics: &UserMetrics,
        unlocked: &UnlockedBadges,
        now: DateTime<Utc>,
        relevant: impl Fn(&BadgeDefinition) -> bool,
    ) -> Vec<BadgeUnlockResult> {
        self.catalog
            .iter()
            .filter(|badge| !unlocked.contains(badge.id))
            .filter(|badge| relevant(badge))
            .filter(|badge| self.evaluate_criteria(&badge.criteria, metrics))
            .map(|badge| BadgeUnlockResult {
                badge,
                unlocked_at: now,
                xp_reward: badge.xp_reward,
                is_first_unlock: true,
            })
            .collect()
    }

    /// Progress toward a badge. `None` for an unknown id.
    #[must_use]
    pub fn progress(
        &self,
        badge_id: &str,
        metrics: &UserMetrics,
        unlocked: &UnlockedBadges,
    ) -> Option<BadgeProgress> {
        let badge = self.find(badge_id)?;
        let (current_value, target_value, percent) = badge.criteria.progress(metrics);
        let unlocked_at = unlocked.unlocked_at(badge.id);

        Some(BadgeProgress {
            badge_id: badge.id,
            current_value,
            target_value,
            progress_percent: if unlocked_at.is_some() { 100 } else { percent },
            unlocked: unlocked_at.is_some(),
            unlocked_at,
            hidden: badge.hidden,
        })
    }

    /// Badges for display, in catalog order.
    ///
    /// Hidden badges are only listed when `include_hidden` is set or they are
    /// already unlocked.
    #[must_use]
    pub fn badges(&self, include_hidden: bool, unlocked: &UnlockedBadges) -> Vec<BadgeView> {
        self.catalog
            .iter()
            .filter_map(|badge| {
                let unlocked_at = unlocked.unlocked_at(badge.id);
                if badge.hidden && !include_hidden && unlocked_at.is_none() {
                    return None;
                }
                Some(BadgeView {
                    badge,
                    unlocked: unlocked_at.is_some(),
                    unlocked_at,
                    hidden: badge.hidden,
                    concealed: badge.hidden && unlocked_at.is_none(),
                })
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::{BadgeCategory, Rarity};
    use crate::metrics::MetricKey;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_780_000_000, 0).single().expect("valid timestamp")
    }

    static TINY: &[BadgeDefinition] = &[
        BadgeDefinition::new(
            "one",
            "One",
            "One lesson",
            "1",
            Rarity::Common,
            BadgeCategory::Learning,
            Criteria::Count {
                metric: MetricKey::LessonsCompleted,
                threshold: 1,
            },
        ),
        BadgeDefinition::new(
            "quiz",
            "Quiz",
            "One quiz",
            "Q",
            Rarity::Rare,
            BadgeCategory::Quiz,
            Criteria::Count {
                metric: MetricKey::QuizzesCompleted,
                threshold: 1,
            },
        ),
        BadgeDefinition::new(
            "secret",
            "Secret",
            "Late night",
            "S",
            Rarity::Epic,
            BadgeCategory::Secret,
            Criteria::Count {
                metric: MetricKey::NightSessions,
                threshold: 1,
            },
        )
        .hidden(),
    ];

    #[test]
    fn first_lesson_unlocks_first_badge() {
        let engine = BadgeEngine::new();
        let mut metrics = UserMetrics::new();
        metrics.set(MetricKey::LessonsCompleted, 1);

        let results = engine.check_all_unlocks(&metrics, &UnlockedBadges::new(), now());
        let ids: Vec<_> = results.iter().map(|r| r.badge.id).collect();
        assert_eq!(ids, vec!["first_lesson"]);
        assert_eq!(results[0].xp_reward, 10);
        assert!(results[0].is_first_unlock);
        assert_eq!(results[0].unlocked_at, now());
    }

    #[test]
    fn unlocked_badges_are_skipped() {
        let engine = BadgeEngine::with_catalog(TINY);
        let mut metrics = UserMetrics::new();
        metrics.set(MetricKey::LessonsCompleted, 5);
        let mut unlocked = UnlockedBadges::new();
        unlocked.insert("one", now());

        assert!(engine.check_all_unlocks(&metrics, &unlocked, now()).is_empty());
    }

    #[test]
    fn event_check_narrows_to_related_badges() {
        let engine = BadgeEngine::with_catalog(TINY);
        let mut metrics = UserMetrics::new();
        metrics.set(MetricKey::LessonsCompleted, 1);
        metrics.set(MetricKey::QuizzesCompleted, 1);
        let unlocked = UnlockedBadges::new();

        let lesson = engine.check_unlocks_for_event(ActivityKind::Lesson, &metrics, &unlocked, now());
        assert_eq!(lesson.len(), 1);
        assert_eq!(lesson[0].badge.id, "one");

        let quiz = engine.check_unlocks_for_event(ActivityKind::Quiz, &metrics, &unlocked, now());
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].badge.id, "quiz");
    }

    #[test]
    fn event_check_is_subset_of_full_scan() {
        let engine = BadgeEngine::new();
        let mut metrics = UserMetrics::new();
        for key in MetricKey::ALL {
            metrics.set(key, 1_000);
        }
        let unlocked = UnlockedBadges::new();
        let full: Vec<_> = engine
            .check_all_unlocks(&metrics, &unlocked, now())
            .into_iter()
            .map(|r| r.badge.id)
            .collect();

        for kind in [
            ActivityKind::Lesson,
            ActivityKind::Quiz,
            ActivityKind::DailyLogin,
            ActivityKind::Streak,
            ActivityKind::XpEarned,
            ActivityKind::BadgeUnlocked,
            ActivityKind::Session,
        ] {
            for result in engine.check_unlocks_for_event(kind, &metrics, &unlocked, now()) {
                assert!(full.contains(&result.badge.id), "{:?} -> {}", kind, result.badge.id);
            }
        }
    }

    #[test]
    fn progress_reports_unlocked_as_complete() {
        let engine = BadgeEngine::new();
        let metrics = UserMetrics::new();
        let mut unlocked = UnlockedBadges::new();
        unlocked.insert("lessons_10", now());

        let progress = engine.progress("lessons_10", &metrics, &unlocked).expect("known badge");
        assert!(progress.unlocked);
        assert_eq!(progress.progress_percent, 100);
        assert_eq!(progress.unlocked_at, Some(now()));
    }

    #[test]
    fn progress_for_count_badge() {
        let engine = BadgeEngine::new();
        let mut metrics = UserMetrics::new();
        metrics.set(MetricKey::LessonsCompleted, 5);

        let progress = engine
            .progress("lessons_10", &metrics, &UnlockedBadges::new())
            .expect("known badge");
        assert_eq!(progress.current_value, 5);
        assert_eq!(progress.target_value, 10);
        assert_eq!(progress.progress_percent, 50);
        assert!(!progress.unlocked);
    }

    #[test]
    fn progress_for_unknown_badge_is_none() {
        let engine = BadgeEngine::new();
        assert!(engine
            .progress("does_not_exist", &UserMetrics::new(), &UnlockedBadges::new())
            .is_none());
    }

    #[test]
    fn hidden_badges_excluded_by_default() {
        let engine = BadgeEngine::with_catalog(TINY);
        let unlocked = UnlockedBadges::new();

        let visible = engine.badges(false, &unlocked);
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|v| !v.hidden));

        let all = engine.badges(true, &unlocked);
        assert_eq!(all.len(), 3);
        let secret = all.iter().find(|v| v.badge.id == "secret").expect("listed");
        assert!(secret.concealed);
    }

    #[test]
    fn unlocked_hidden_badge_is_listed_and_revealed() {
        let engine = BadgeEngine::with_catalog(TINY);
        let mut unlocked = UnlockedBadges::new();
        unlocked.insert("secret", now());

        let visible = engine.badges(false, &unlocked);
        let secret = visible.iter().find(|v| v.badge.id == "secret").expect("listed");
        assert!(secret.unlocked);
        assert!(!secret.concealed);
    }

    #[test]
    fn concealed_view_serializes_without_definition() {
        let engine = BadgeEngine::with_catalog(TINY);
        let mut unlocked = UnlockedBadges::new();

        let all = engine.badges(true, &unlocked);
        let secret = all.iter().find(|v| v.badge.id == "secret").expect("listed");
        let json = serde_json::to_value(secret).expect("serialize");
        assert!(json["badge"].is_null());
        assert_eq!(json["concealed"], true);
        let text = json.to_string();
        assert!(!text.contains("Secret"));
        assert!(!text.contains("Late night"));

        unlocked.insert("secret", now());
        let revealed = engine.badges(true, &unlocked);
        let secret = revealed.iter().find(|v| v.badge.id == "secret").expect("listed");
        let json = serde_json::to_value(secret).expect("serialize");
        assert_eq!(json["badge"]["name"], "Secret");
        assert_eq!(json["concealed"], false);
    }
}
