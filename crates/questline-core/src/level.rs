//! # Level System
//!
//! Pure functions mapping total XP to a level and the progress inside it.
//!
//! The curve is `floor(BASE_XP * level^1.5)`. It is computed as
//! `isqrt(BASE_XP^2 * level^3)`, which is the same value without
//! floating-point rounding.
//!
//! | Level | XP for level | Cumulative XP to reach |
//! |-------|--------------|------------------------|
//! | 1     | 100          | 0                      |
//! | 2     | 282          | 100                    |
//! | 3     | 519          | 382                    |
//! | 10    | 3162         | ~17k                   |
//! | 100   | 100000       | ~3.9M                  |

use crate::primitives::{BASE_XP, MAX_LEVEL};
use serde::{Deserialize, Serialize};

/// Level titles `(minimum_level, title)`, ascending.
pub const LEVEL_TITLES: [(u32, &str); 13] = [
    (1, "Novice Learner"),
    (5, "Curious Mind"),
    (10, "Dedicated Student"),
    (15, "Knowledge Seeker"),
    (20, "Rising Scholar"),
    (25, "Skilled Practitioner"),
    (30, "Adept"),
    (40, "Expert"),
    (50, "Master"),
    (60, "Grandmaster"),
    (75, "Sage"),
    (90, "Legend"),
    (100, "Enlightened"),
];

/// Title used when no milestone matches.
pub const DEFAULT_TITLE: &str = "Newcomer";

/// Derived level position for a total XP value.
///
/// Never persisted; always recomputed from `total_xp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: u32,
    /// XP accrued inside the current level.
    pub current_xp: u64,
    /// XP still missing for the next level (0 at max level).
    pub xp_to_next_level: u64,
    pub total_xp: u64,
    /// 0..=100, floored.
    pub progress_percent: u8,
}

impl LevelInfo {
    /// Whether this is the last reachable level.
    #[must_use]
    pub fn is_max_level(&self) -> bool {
        self.level >= MAX_LEVEL
    }

    /// Display title for this level.
    #[must_use]
    pub fn title(&self) -> &'static str {
        LevelSystem::title_for_level(self.level)
    }
}

/// Stateless level calculator.
pub struct LevelSystem;

impl LevelSystem {
    /// XP required to advance from `level` to `level + 1`.
    ///
    /// Levels below 1 are treated as 1, levels above `MAX_LEVEL` as `MAX_LEVEL`.
    #[must_use]
    pub fn xp_for_level(level: u32) -> u64 {
        let level = u64::from(level.clamp(1, MAX_LEVEL));
        let cubed = level.saturating_mul(level).saturating_mul(level);
        BASE_XP.saturating_mul(BASE_XP).saturating_mul(cubed).isqrt()
    }

    /// Total XP needed to reach `level` from zero.
    #[must_use]
    pub fn cumulative_xp_for_level(level: u32) -> u64 {
        (1..level.max(1)).fold(0u64, |acc, l| {
            acc.saturating_add(Self::xp_for_level(l))
        })
    }

    /// Compute the level position for a total XP value.
    #[must_use]
    pub fn level_for(total_xp: u64) -> LevelInfo {
        let mut level = 1u32;
        let mut remainder = total_xp;

        while level < MAX_LEVEL {
            let required = Self::xp_for_level(level);
            if remainder < required {
                break;
            }
            remainder -= required;
            level += 1;
        }

        if level >= MAX_LEVEL {
            return LevelInfo {
                level,
                current_xp: remainder,
                xp_to_next_level: 0,
                total_xp,
                progress_percent: 100,
            };
        }

        let required = Self::xp_for_level(level);
        let progress = remainder.saturating_mul(100) / required;

        LevelInfo {
            level,
            current_xp: remainder,
            xp_to_next_level: required - remainder,
            total_xp,
            progress_percent: progress.min(100) as u8,
        }
    }

    /// Whether adding `xp_to_add` crosses at least one level boundary.
    #[must_use]
    pub fn would_level_up(total_xp: u64, xp_to_add: u64) -> bool {
        Self::levels_gained(total_xp, xp_to_add) > 0
    }

    /// Number of levels crossed by adding `xp_to_add`.
    #[must_use]
    pub fn levels_gained(total_xp: u64, xp_to_add: u64) -> u32 {
        let before = Self::level_for(total_xp).level;
        let after = Self::level_for(total_xp.saturating_add(xp_to_add)).level;
        after.saturating_sub(before)
    }

    /// Title for a level: the highest milestone not above it.
    #[must_use]
    pub fn title_for_level(level: u32) -> &'static str {
        LEVEL_TITLES
            .iter()
            .rev()
            .find(|(min, _)| level >= *min)
            .map(|(_, title)| *title)
            .unwrap_or(DEFAULT_TITLE)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_curve_matches_formula() {
        assert_eq!(LevelSystem::xp_for_level(1), 100);
        assert_eq!(LevelSystem::xp_for_level(2), 282);
        assert_eq!(LevelSystem::xp_for_level(3), 519);
        assert_eq!(LevelSystem::xp_for_level(4), 800);
        assert_eq!(LevelSystem::xp_for_level(9), 2700);
        assert_eq!(LevelSystem::xp_for_level(100), 100_000);
    }

    #[test]
    fn xp_for_level_clamps_out_of_range() {
        assert_eq!(LevelSystem::xp_for_level(0), LevelSystem::xp_for_level(1));
        assert_eq!(
            LevelSystem::xp_for_level(250),
            LevelSystem::xp_for_level(MAX_LEVEL)
        );
    }

    #[test]
    fn zero_xp_is_level_one() {
        let info = LevelSystem::level_for(0);
        assert_eq!(info.level, 1);
        assert_eq!(info.current_xp, 0);
        assert_eq!(info.xp_to_next_level, 100);
        assert_eq!(info.progress_percent, 0);
    }

    #[test]
    fn crossing_first_boundary() {
        let info = LevelSystem::level_for(110);
        assert_eq!(info.level, 2);
        assert_eq!(info.current_xp, 10);
        assert_eq!(info.xp_to_next_level, LevelSystem::xp_for_level(2) - 10);
        assert_eq!(info.progress_percent, 3);
    }

    #[test]
    fn exact_boundary_starts_next_level() {
        let info = LevelSystem::level_for(100);
        assert_eq!(info.level, 2);
        assert_eq!(info.current_xp, 0);
    }

    #[test]
    fn max_level_reports_full_progress() {
        let total = LevelSystem::cumulative_xp_for_level(MAX_LEVEL) + 12_345;
        let info = LevelSystem::level_for(total);
        assert_eq!(info.level, MAX_LEVEL);
        assert!(info.is_max_level());
        assert_eq!(info.xp_to_next_level, 0);
        assert_eq!(info.progress_percent, 100);
        assert_eq!(info.current_xp, 12_345);
    }

    #[test]
    fn multi_level_jump() {
        assert_eq!(LevelSystem::levels_gained(0, 1_000), 3);
        assert!(LevelSystem::would_level_up(90, 20));
        assert!(!LevelSystem::would_level_up(0, 99));
        assert_eq!(LevelSystem::levels_gained(0, 0), 0);
    }

    #[test]
    fn titles_follow_milestones() {
        assert_eq!(LevelSystem::title_for_level(0), DEFAULT_TITLE);
        assert_eq!(LevelSystem::title_for_level(1), "Novice Learner");
        assert_eq!(LevelSystem::title_for_level(4), "Novice Learner");
        assert_eq!(LevelSystem::title_for_level(5), "Curious Mind");
        assert_eq!(LevelSystem::title_for_level(74), "Grandmaster");
        assert_eq!(LevelSystem::title_for_level(100), "Enlightened");
    }
}
