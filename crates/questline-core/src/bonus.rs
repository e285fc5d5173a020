//! # Streak Bonus Table
//!
//! The single tiered lookup for streak bonuses. Both the XP calculator and
//! the streak engine read from here.
//!
//! | Streak days | Bonus |
//! |-------------|-------|
//! | 0..=6       | +0%   |
//! | 7..=13      | +10%  |
//! | 14..=29     | +25%  |
//! | 30..=99     | +50%  |
//! | 100+        | +100% |

use crate::primitives::STREAK_BONUS_TIERS;

/// Bonus percent earned by a streak of `streak_days`.
#[must_use]
pub fn streak_bonus_percent(streak_days: u32) -> u64 {
    STREAK_BONUS_TIERS
        .iter()
        .find(|(min_days, _)| streak_days >= *min_days)
        .map(|(_, percent)| *percent)
        .unwrap_or(0)
}

/// Multiplier in percent (`110` means x1.10).
#[must_use]
pub fn streak_multiplier_percent(streak_days: u32) -> u64 {
    100 + streak_bonus_percent(streak_days)
}

/// `floor(base * (100 + bonus) / 100)`.
#[must_use]
pub fn apply_bonus(base: u64, streak_days: u32) -> u64 {
    base.saturating_mul(streak_multiplier_percent(streak_days)) / 100
}
