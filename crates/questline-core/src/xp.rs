//! # XP Calculator
//!
//! Pure reward rules. Nothing here reads state or time; callers pass the
//! streak length they want the bonus to be based on.

use crate::badge::Rarity;
use crate::bonus;
use crate::primitives::{
    DAILY_LOGIN_XP, LESSON_SCORE_MULTIPLIERS, LESSON_XP, LOGIN_MILESTONE_BONUSES,
    PERFECT_SCORE, QUIZ_PASS_SCORE, QUIZ_PASS_XP, QUIZ_PERFECT_XP, WEEKLY_LOGIN_BONUS,
};
use crate::types::XpSource;

/// Stateless XP reward calculator.
pub struct XpCalculator;

impl XpCalculator {
    /// XP for a completed lesson.
    ///
    /// The base is scaled by score (x2.0 at 100, x1.5 at 90+, x1.2 at 70+)
    /// and then receives the streak bonus.
    #[must_use]
    pub fn lesson_xp(score: u32, streak_days: u32) -> u64 {
        let tenths = LESSON_SCORE_MULTIPLIERS
            .iter()
            .find(|(min_score, _)| score >= *min_score)
            .map(|(_, tenths)| *tenths)
            .unwrap_or(10);
        let base = LESSON_XP * tenths / 10;
        bonus::apply_bonus(base, streak_days)
    }

    /// XP for a completed quiz. Failing scores (< 50) earn nothing.
    ///
    /// Passing scores interpolate linearly between the pass and perfect
    /// rewards, floored, then receive the streak bonus.
    #[must_use]
    pub fn quiz_xp(score: u32, streak_days: u32) -> u64 {
        if score < QUIZ_PASS_SCORE {
            return 0;
        }
        let score = score.min(PERFECT_SCORE);
        let span = QUIZ_PERFECT_XP - QUIZ_PASS_XP;
        let above_pass = u64::from(score - QUIZ_PASS_SCORE);
        let range = u64::from(PERFECT_SCORE - QUIZ_PASS_SCORE);
        let base = QUIZ_PASS_XP + above_pass * span / range;
        bonus::apply_bonus(base, streak_days)
    }

    /// XP for the first login of a day.
    ///
    /// Milestone days (5/10/30/100) take their milestone bonus; other
    /// multiples of seven take the weekly bonus.
    #[must_use]
    pub fn daily_login_xp(consecutive_days: u32) -> u64 {
        if let Some((_, bonus)) = LOGIN_MILESTONE_BONUSES
            .iter()
            .find(|(days, _)| *days == consecutive_days)
        {
            DAILY_LOGIN_XP + bonus
        } else if consecutive_days > 0 && consecutive_days % 7 == 0 {
            DAILY_LOGIN_XP + WEEKLY_LOGIN_BONUS
        } else {
            DAILY_LOGIN_XP
        }
    }

    /// XP granted when a badge of the given rarity is unlocked.
    #[must_use]
    pub fn badge_xp(rarity: Rarity) -> u64 {
        rarity.xp_reward()
    }

    /// Apply the streak bonus to `base` unless the source must not compound.
    ///
    /// `streak_bonus` awards are already a bonus; badge and login rewards
    /// have their own fixed schedules.
    #[must_use]
    pub fn apply_streak_bonus(base: u64, streak_days: u32, source: XpSource) -> u64 {
        if source.receives_streak_bonus() {
            bonus::apply_bonus(base, streak_days)
        } else {
            base
        }
    }

    /// Bonus percent for a streak length.
    #[must_use]
    pub fn streak_bonus_percent(streak_days: u32) -> u64 {
        bonus::streak_bonus_percent(streak_days)
    }

    /// Short display form: `950`, `1.5K`, `2.3M`.
    #[must_use]
    pub fn format_xp(xp: u64) -> String {
        if xp >= 1_000_000 {
            format_scaled(xp, 1_000_000, 'M')
        } else if xp >= 1_000 {
            format_scaled(xp, 1_000, 'K')
        } else {
            xp.to_string()
        }
    }
}

/// One decimal place, rounded half up.
fn format_scaled(xp: u64, unit: u64, suffix: char) -> String {
    let tenths = (xp.saturating_mul(10) + unit / 2) / unit;
    format!("{}.{}{}", tenths / 10, tenths % 10, suffix)
}

// =============================================================================
// TESTS
// =============================================================================
