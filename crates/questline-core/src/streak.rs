//! # Streak Engine
//!
//! Day-resolution state machine over consecutive learning days.
//!
//! The state is implicit in `{last_activity_date, current_streak,
//! streak_freezes, freeze_active_date}`:
//!
//! | Last activity      | Freeze active yesterday | Next activity |
//! |--------------------|-------------------------|---------------|
//! | today              | -                       | no change     |
//! | yesterday          | -                       | streak + 1    |
//! | older / none       | yes                     | streak + 1    |
//! | older / none       | no                      | restart at 1  |
//!
//! The engine never mutates the caller's state. Every operation returns a
//! description of the change (the resulting state plus what happened) and the
//! owner decides whether to commit it.

use crate::bonus;
use crate::clock::Clock;
use crate::primitives::{MAX_FREEZES, WARNING_HOUR};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// MILESTONES
// =============================================================================

/// A streak length that pays out freezes and a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakMilestone {
    pub days: u32,
    pub freeze_reward: u32,
    pub badge_id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// Milestones in ascending order of days.
pub const STREAK_MILESTONES: [StreakMilestone; 3] = [
    StreakMilestone {
        days: 7,
        freeze_reward: 1,
        badge_id: "streak_7",
        title: "Week Warrior",
        description: "Learned seven days in a row",
    },
    StreakMilestone {
        days: 30,
        freeze_reward: 2,
        badge_id: "streak_30",
        title: "Monthly Master",
        description: "Learned thirty days in a row",
    },
    StreakMilestone {
        days: 100,
        freeze_reward: 3,
        badge_id: "streak_100",
        title: "Century Legend",
        description: "Learned one hundred days in a row",
    },
];

// =============================================================================
// STATE & CHANGE DESCRIPTIONS
// =============================================================================

/// Streak portion of the progression state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    /// High-water mark.
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    /// 0..=MAX_FREEZES.
    pub streak_freezes: u32,
    /// Day on which a freeze protected the streak.
    pub freeze_active_date: Option<NaiveDate>,
    pub is_at_risk: bool,
}

impl StreakState {
    /// Whether activity was already recorded on `today`.
    #[must_use]
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.last_activity_date == Some(today)
    }

    /// Whether a freeze protects `today`.
    #[must_use]
    pub fn freeze_used_on(&self, today: NaiveDate) -> bool {
        self.freeze_active_date == Some(today)
    }

    /// Whether activity on `today` would extend the streak: yesterday was
    /// either active or covered by a freeze.
    #[must_use]
    pub fn carries_into(&self, today: NaiveDate) -> bool {
        let yesterday = today.pred_opt();
        yesterday.is_some()
            && (self.last_activity_date == yesterday || self.freeze_active_date == yesterday)
    }
}

/// Result of recording activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakUpdate {
    /// State after the activity.
    pub state: StreakState,
    pub previous_streak: u32,
    /// `false` when activity was already recorded today.
    pub changed: bool,
    /// Whether the streak carried over instead of restarting.
    pub continued: bool,
    pub is_new_record: bool,
    pub milestone: Option<&'static StreakMilestone>,
    /// Freezes actually added by the milestone (after the cap).
    pub freezes_awarded: u32,
}

/// Periodic status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakStatus {
    pub active_today: bool,
    pub is_at_risk: bool,
    pub can_use_freeze: bool,
}

/// Why a freeze could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeDenial {
    NoFreezes,
    AlreadyUsedToday,
    ActiveToday,
    NoStreak,
}

impl std::fmt::Display for FreezeDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            FreezeDenial::NoFreezes => "no streak freezes available",
            FreezeDenial::AlreadyUsedToday => "a freeze was already used today",
            FreezeDenial::ActiveToday => "activity already recorded today",
            FreezeDenial::NoStreak => "no streak to protect",
        };
        f.write_str(reason)
    }
}

/// Result of attempting to use a freeze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreezeOutcome {
    Applied { state: StreakState, remaining: u32 },
    Denied(FreezeDenial),
}

/// A streak that lapsed and was reset to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakBreak {
    pub state: StreakState,
    pub previous_streak: u32,
    pub longest_streak: u32,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Streak rules bound to a clock.
#[derive(Clone)]
pub struct StreakEngine {
    clock: Arc<dyn Clock>,
    warning_hour: u32,
}

impl std::fmt::Debug for StreakEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreakEngine")
            .field("today", &self.clock.today())
            .field("warning_hour", &self.warning_hour)
            .finish_non_exhaustive()
    }
}

impl StreakEngine {
    /// Create an engine with the default warning hour.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_warning_hour(clock, WARNING_HOUR)
    }

    /// Create an engine that reports risk from `warning_hour` on.
    #[must_use]
    pub fn with_warning_hour(clock: Arc<dyn Clock>, warning_hour: u32) -> Self {
        Self {
            clock,
            warning_hour: warning_hour.min(23),
        }
    }

    #[must_use]
    pub fn warning_hour(&self) -> u32 {
        self.warning_hour
    }

    /// Record a day of activity.
    #[must_use]
    pub fn record_activity(&self, state: &StreakState) -> StreakUpdate {
        let today = self.clock.today();
        let previous_streak = state.current_streak;

        if state.is_active_on(today) {
            return StreakUpdate {
                state: state.clone(),
                previous_streak,
                changed: false,
                continued: true,
                is_new_record: false,
                milestone: None,
                freezes_awarded: 0,
            };
        }

        let continued = state.carries_into(today);

        let new_streak = if continued {
            previous_streak.saturating_add(1)
        } else {
            1
        };

        let is_new_record = new_streak > state.longest_streak;
        let milestone = milestone_for(new_streak);

        let mut next = state.clone();
        next.current_streak = new_streak;
        next.longest_streak = state.longest_streak.max(new_streak);
        next.last_activity_date = Some(today);
        next.freeze_active_date = None;
        next.is_at_risk = false;

        let mut freezes_awarded = 0;
        if let Some(milestone) = milestone {
            let capped = capped_freezes(state.streak_freezes, milestone.freeze_reward);
            freezes_awarded = capped - state.streak_freezes.min(MAX_FREEZES);
            next.streak_freezes = capped;
            tracing::debug!(
                days = milestone.days,
                freezes_awarded,
                "streak milestone reached"
            );
        }

        StreakUpdate {
            state: next,
            previous_streak,
            changed: true,
            continued,
            is_new_record,
            milestone,
            freezes_awarded,
        }
    }

    /// Evaluate at-risk and freeze availability. Has no side effects.
    #[must_use]
    pub fn check_status(&self, state: &StreakState) -> StreakStatus {
        let today = self.clock.today();
        let active_today = state.is_active_on(today);
        let frozen_today = state.freeze_used_on(today);
        let has_streak = state.current_streak > 0 && state.carries_into(today);

        StreakStatus {
            active_today,
            is_at_risk: !active_today
                && !frozen_today
                && has_streak
                && self.clock.hour() >= self.warning_hour,
            can_use_freeze: !active_today
                && !frozen_today
                && has_streak
                && state.streak_freezes > 0,
        }
    }

    /// Spend one freeze to protect today.
    ///
    /// A freeze used today counts as activity yesterday for tomorrow's
    /// continuation check. It covers a single missed day, so the streak must
    /// still carry into today.
    #[must_use]
    pub fn use_freeze(&self, state: &StreakState) -> FreezeOutcome {
        let today = self.clock.today();

        if state.streak_freezes == 0 {
            return FreezeOutcome::Denied(FreezeDenial::NoFreezes);
        }
        if state.freeze_used_on(today) {
            return FreezeOutcome::Denied(FreezeDenial::AlreadyUsedToday);
        }
        if state.is_active_on(today) {
            return FreezeOutcome::Denied(FreezeDenial::ActiveToday);
        }
        if state.current_streak == 0 || !state.carries_into(today) {
            return FreezeOutcome::Denied(FreezeDenial::NoStreak);
        }

        let mut next = state.clone();
        next.streak_freezes = state.streak_freezes.min(MAX_FREEZES) - 1;
        next.freeze_active_date = Some(today);
        next.is_at_risk = false;

        FreezeOutcome::Applied {
            remaining: next.streak_freezes,
            state: next,
        }
    }

    /// Add freezes, capped at `MAX_FREEZES`. Returns the new state and the
    /// number actually added.
    #[must_use]
    pub fn award_freezes(&self, state: &StreakState, count: u32) -> (StreakState, u32) {
        let mut next = state.clone();
        let current = state.streak_freezes.min(MAX_FREEZES);
        next.streak_freezes = capped_freezes(current, count);
        let awarded = next.streak_freezes - current;
        (next, awarded)
    }

    /// Reset a lapsed streak at session start.
    ///
    /// Returns `None` when the streak is still alive (activity today or
    /// yesterday, or a freeze covered yesterday) or already zero.
    #[must_use]
    pub fn check_and_break(&self, state: &StreakState) -> Option<StreakBreak> {
        let today = self.clock.today();

        if state.current_streak == 0 || state.is_active_on(today) || state.carries_into(today) {
            return None;
        }

        let mut next = state.clone();
        next.current_streak = 0;
        next.is_at_risk = false;

        Some(StreakBreak {
            previous_streak: state.current_streak,
            longest_streak: state.longest_streak,
            state: next,
        })
    }

    /// Bonus percent for a streak length (shared table).
    #[must_use]
    pub fn streak_bonus_percent(streak_days: u32) -> u64 {
        bonus::streak_bonus_percent(streak_days)
    }

    /// Multiplier in percent for a streak length (shared table).
    #[must_use]
    pub fn streak_multiplier_percent(streak_days: u32) -> u64 {
        bonus::streak_multiplier_percent(streak_days)
    }

    /// First milestone strictly above `streak_days`.
    #[must_use]
    pub fn next_milestone(streak_days: u32) -> Option<&'static StreakMilestone> {
        STREAK_MILESTONES.iter().find(|m| m.days > streak_days)
    }

    /// Days left until the next milestone.
    #[must_use]
    pub fn days_until_next_milestone(streak_days: u32) -> Option<u32> {
        Self::next_milestone(streak_days).map(|m| m.days - streak_days)
    }
}

/// Milestone reached at exactly `streak_days`, if any.
#[must_use]
pub fn milestone_for(streak_days: u32) -> Option<&'static StreakMilestone> {
    STREAK_MILESTONES.iter().find(|m| m.days == streak_days)
}

fn capped_freezes(current: u32, add: u32) -> u32 {
    current.saturating_add(add).min(MAX_FREEZES)
}

// =============================================================================
// TESTS
// =============================================================================
