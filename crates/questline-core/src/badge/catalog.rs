//! Built-in badge catalog.
//!
//! Streak badges share their ids with the streak milestones so a milestone
//! reached through a daily login and a full criteria scan unlock the same
//! badge.

use super::{BadgeCategory, BadgeDefinition, Criteria, Rarity};
use crate::metrics::MetricKey;

const fn count(metric: MetricKey, threshold: u64) -> Criteria {
    Criteria::Count { metric, threshold }
}

const fn streak(threshold: u64) -> Criteria {
    Criteria::Streak {
        metric: MetricKey::CurrentStreak,
        threshold,
    }
}

const fn level(threshold: u64) -> Criteria {
    Criteria::Level {
        metric: MetricKey::Level,
        threshold,
    }
}

/// Every badge the engine knows about, in display order.
pub static BADGES: &[BadgeDefinition] = &[
    // -------------------------------------------------------------------------
    // Learning
    // -------------------------------------------------------------------------
    BadgeDefinition::new(
        "first_lesson",
        "First Steps",
        "Complete your first lesson",
        "👣",
        Rarity::Common,
        BadgeCategory::Learning,
        count(MetricKey::LessonsCompleted, 1),
    ),
    BadgeDefinition::new(
        "lessons_10",
        "Getting Started",
        "Complete 10 lessons",
        "📘",
        Rarity::Common,
        BadgeCategory::Learning,
        count(MetricKey::LessonsCompleted, 10),
    ),
    BadgeDefinition::new(
        "lessons_50",
        "Bookworm",
        "Complete 50 lessons",
        "📚",
        Rarity::Rare,
        BadgeCategory::Learning,
        count(MetricKey::LessonsCompleted, 50),
    ),
    BadgeDefinition::new(
        "lessons_100",
        "Scholar",
        "Complete 100 lessons",
        "🎓",
        Rarity::Epic,
        BadgeCategory::Learning,
        count(MetricKey::LessonsCompleted, 100),
    ),
    BadgeDefinition::new(
        "course_complete",
        "Course Graduate",
        "Finish a whole course",
        "🏁",
        Rarity::Rare,
        BadgeCategory::Learning,
        count(MetricKey::CoursesCompleted, 1),
    ),
    BadgeDefinition::new(
        "courses_5",
        "Curriculum Crusher",
        "Finish five courses",
        "🗺️",
        Rarity::Epic,
        BadgeCategory::Learning,
        count(MetricKey::CoursesCompleted, 5),
    ),
    // -------------------------------------------------------------------------
    // Quizzes
    // -------------------------------------------------------------------------
    BadgeDefinition::new(
        "first_quiz",
        "Quiz Taker",
        "Complete your first quiz",
        "📝",
        Rarity::Common,
        BadgeCategory::Quiz,
        count(MetricKey::QuizzesCompleted, 1),
    ),
    BadgeDefinition::new(
        "perfect_quiz",
        "Perfectionist",
        "Score 100% on a quiz",
        "💯",
        Rarity::Rare,
        BadgeCategory::Quiz,
        count(MetricKey::PerfectQuizzes, 1),
    ),
    BadgeDefinition::new(
        "perfect_quiz_10",
        "Flawless",
        "Score 100% on 10 quizzes",
        "🌟",
        Rarity::Epic,
        BadgeCategory::Quiz,
        count(MetricKey::PerfectQuizzes, 10),
    ),
    // -------------------------------------------------------------------------
    // Streaks
    // -------------------------------------------------------------------------
    BadgeDefinition::new(
        "streak_3",
        "Warming Up",
        "Learn three days in a row",
        "🔥",
        Rarity::Common,
        BadgeCategory::Streak,
        streak(3),
    ),
    BadgeDefinition::new(
        "streak_7",
        "Week Warrior",
        "Learn seven days in a row",
        "📅",
        Rarity::Rare,
        BadgeCategory::Streak,
        streak(7),
    ),
    BadgeDefinition::new(
        "streak_30",
        "Monthly Master",
        "Learn thirty days in a row",
        "🗓️",
        Rarity::Epic,
        BadgeCategory::Streak,
        streak(30),
    ),
    BadgeDefinition::new(
        "streak_100",
        "Century Legend",
        "Learn one hundred days in a row",
        "👑",
        Rarity::Legendary,
        BadgeCategory::Streak,
        streak(100),
    ),
    // -------------------------------------------------------------------------
    // Levels
    // -------------------------------------------------------------------------
    BadgeDefinition::new(
        "level_5",
        "Rising Star",
        "Reach level 5",
        "⭐",
        Rarity::Common,
        BadgeCategory::Level,
        level(5),
    ),
    BadgeDefinition::new(
        "level_10",
        "Double Digits",
        "Reach level 10",
        "🔟",
        Rarity::Rare,
        BadgeCategory::Level,
        level(10),
    ),
    BadgeDefinition::new(
        "level_25",
        "Seasoned",
        "Reach level 25",
        "🏅",
        Rarity::Epic,
        BadgeCategory::Level,
        level(25),
    ),
    BadgeDefinition::new(
        "level_50",
        "Half Way There",
        "Reach level 50",
        "🏆",
        Rarity::Legendary,
        BadgeCategory::Level,
        level(50),
    ),
    // -------------------------------------------------------------------------
    // Speed
    // -------------------------------------------------------------------------
    BadgeDefinition::new(
        "speed_lesson",
        "Quick Study",
        "Finish a lesson in under two minutes",
        "⚡",
        Rarity::Rare,
        BadgeCategory::Speed,
        Criteria::Time {
            metric: MetricKey::FastestLessonSeconds,
            threshold: 120,
        },
    ),
    BadgeDefinition::new(
        "speed_quiz",
        "Lightning Round",
        "Finish a quiz in under a minute",
        "🌩️",
        Rarity::Epic,
        BadgeCategory::Speed,
        Criteria::Time {
            metric: MetricKey::FastestQuizSeconds,
            threshold: 60,
        },
    ),
    // -------------------------------------------------------------------------
    // Mastery
    // -------------------------------------------------------------------------
    BadgeDefinition::new(
        "well_rounded",
        "Well Rounded",
        "Complete 25 lessons and 10 quizzes",
        "🧭",
        Rarity::Rare,
        BadgeCategory::Mastery,
        Criteria::Composite {
            conditions: &[
                count(MetricKey::LessonsCompleted, 25),
                count(MetricKey::QuizzesCompleted, 10),
            ],
        },
    ),
    BadgeDefinition::new(
        "dedicated_scholar",
        "Dedicated Scholar",
        "Reach level 10 with a 14-day streak and 5 perfect quizzes",
        "🦉",
        Rarity::Legendary,
        BadgeCategory::Mastery,
        Criteria::Composite {
            conditions: &[
                level(10),
                streak(14),
                count(MetricKey::PerfectQuizzes, 5),
            ],
        },
    ),
    BadgeDefinition::new(
        "collector",
        "Collector",
        "Unlock 10 badges",
        "🎖️",
        Rarity::Epic,
        BadgeCategory::Mastery,
        count(MetricKey::BadgesUnlocked, 10),
    ),
    // -------------------------------------------------------------------------
    // Secret
    // -------------------------------------------------------------------------
    BadgeDefinition::new(
        "night_owl",
        "Night Owl",
        "Study late at night five times",
        "🦉",
        Rarity::Rare,
        BadgeCategory::Secret,
        count(MetricKey::NightSessions, 5),
    )
    .hidden(),
    BadgeDefinition::new(
        "early_bird",
        "Early Bird",
        "Study early in the morning five times",
        "🐦",
        Rarity::Rare,
        BadgeCategory::Secret,
        count(MetricKey::EarlySessions, 5),
    )
    .hidden(),
    BadgeDefinition::new(
        "ice_keeper",
        "Ice Keeper",
        "Save your streak with a freeze three times",
        "🧊",
        Rarity::Epic,
        BadgeCategory::Secret,
        count(MetricKey::FreezesUsed, 3),
    )
    .hidden(),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::STREAK_MILESTONES;
    use std::collections::BTreeSet;

    #[test]
    fn ids_are_unique() {
        let ids: BTreeSet<_> = BADGES.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), BADGES.len());
    }

    #[test]
    fn every_streak_milestone_has_a_badge() {
        for milestone in STREAK_MILESTONES {
            assert!(
                BADGES.iter().any(|b| b.id == milestone.badge_id),
                "missing badge {}",
                milestone.badge_id
            );
        }
    }

    #[test]
    fn rewards_follow_rarity() {
        assert!(BADGES.iter().all(|b| b.xp_reward == b.rarity.xp_reward()));
    }

    #[test]
    fn catalog_has_hidden_badges() {
        assert!(BADGES.iter().any(|b| b.hidden));
    }
}
