//! # Rule Primitives
//!
//! Hardcoded constants for the Questline progression rules.
//!
//! Questline starts with zero progress but fixed rules.
//! These primitives are compiled into the binary and are immutable at runtime.
//! Everything here is an integer: multipliers are expressed in tenths or
//! percent so that every computation is exact and reproducible.

// =============================================================================
// LEVEL CURVE
// =============================================================================

/// XP required for level 1 -> 2. The curve is `BASE_XP * level^1.5`.
pub const BASE_XP: u64 = 100;

/// Highest reachable level. Levels beyond reuse this level's requirement.
pub const MAX_LEVEL: u32 = 100;

// =============================================================================
// XP REWARDS
// =============================================================================

/// Base XP for completing a lesson.
pub const LESSON_XP: u64 = 10;

/// XP for passing a quiz with the minimum passing score.
pub const QUIZ_PASS_XP: u64 = 25;

/// XP for a perfect quiz score.
pub const QUIZ_PERFECT_XP: u64 = 50;

/// Minimum quiz score that earns XP.
pub const QUIZ_PASS_SCORE: u32 = 50;

/// Score treated as perfect. Higher scores are clamped to this.
pub const PERFECT_SCORE: u32 = 100;

/// Base XP for the first login of a day.
pub const DAILY_LOGIN_XP: u64 = 5;

/// Flat bonus added on every seventh consecutive login day.
pub const WEEKLY_LOGIN_BONUS: u64 = 15;

/// Login milestones `(consecutive_days, bonus_xp)`.
///
/// Checked before the weekly bonus; the two never stack.
pub const LOGIN_MILESTONE_BONUSES: [(u32, u64); 4] = [(5, 10), (10, 20), (30, 50), (100, 100)];

/// Lesson score multipliers `(minimum_score, multiplier_in_tenths)`,
/// highest first. `20` means x2.0.
pub const LESSON_SCORE_MULTIPLIERS: [(u32, u64); 3] = [(100, 20), (90, 15), (70, 12)];

// =============================================================================
// STREAKS
// =============================================================================

/// Maximum number of streak freezes a learner can hold.
pub const MAX_FREEZES: u32 = 5;

/// Local hour (24h clock) from which an inactive streak is reported at risk.
pub const WARNING_HOUR: u32 = 20;

/// Streak bonus tiers `(minimum_days, bonus_percent)`, highest first.
pub const STREAK_BONUS_TIERS: [(u32, u64); 4] = [(100, 100), (30, 50), (14, 25), (7, 10)];

// =============================================================================
// SESSION TIMES
// =============================================================================

/// Learning at or after this local hour counts as a night session.
pub const NIGHT_SESSION_START_HOUR: u32 = 22;

/// Learning before this local hour counts as a night session.
pub const NIGHT_SESSION_END_HOUR: u32 = 4;

/// Early sessions span `EARLY_SESSION_START_HOUR..EARLY_SESSION_END_HOUR`.
pub const EARLY_SESSION_START_HOUR: u32 = 5;

pub const EARLY_SESSION_END_HOUR: u32 = 8;

// =============================================================================
// HISTORY
// =============================================================================

/// Default number of XP events retained in history.
pub const XP_HISTORY_LIMIT: usize = 100;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the Questline snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"QLSN";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;
