//! # questline-core
//!
//! The deterministic progression engine for Questline.
//!
//! Turns learner actions (lessons, quizzes, daily logins) into experience
//! points, levels, daily streaks and badge unlocks, and tells the host what
//! changed through typed events.
//!
//! ## Components
//!
//! - `level` / `xp` / `bonus`: pure reward and level-curve rules
//! - `streak`: consecutive-day state machine with freezes and milestones
//! - `badge`: criteria evaluation over `UserMetrics`
//! - `store`: the `ProgressionStore` orchestrator
//! - `formats` / `storage`: snapshot encoding and snapshot stores
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Integer arithmetic only; `BTreeMap` for ordering
//! - Time enters only through the `Clock` trait
//! - The store is the single writer of `ProgressionState`

// =============================================================================
// MODULES
// =============================================================================

pub mod badge;
pub mod bonus;
pub mod clock;
pub mod config;
pub mod events;
pub mod formats;
pub mod level;
pub mod metrics;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod streak;
pub mod types;
pub mod xp;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{QuestlineError, UnlockedBadges, XpEvent, XpSource};

// =============================================================================
// RE-EXPORTS: Rules
// =============================================================================

pub use badge::{
    ActivityKind, BADGES, BadgeCategory, BadgeDefinition, BadgeEngine, BadgeProgress,
    BadgeUnlockResult, BadgeView, Criteria, Rarity,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use level::{LevelInfo, LevelSystem};
pub use metrics::{MetricKey, MetricUpdate, UserMetrics};
pub use streak::{
    FreezeDenial, FreezeOutcome, STREAK_MILESTONES, StreakBreak, StreakEngine, StreakMilestone,
    StreakState, StreakStatus, StreakUpdate,
};
pub use xp::XpCalculator;

// =============================================================================
// RE-EXPORTS: Store & Events
// =============================================================================

pub use events::{EventDispatcher, ProgressionEvent, Subscription};
pub use store::{
    ActionOutcome, ActionParams, ProgressionState, ProgressionStats, ProgressionStore,
    SessionStart, StreakData,
};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use formats::{PersistenceHeader, Snapshot, snapshot_from_bytes, snapshot_to_bytes};
pub use storage::{MemorySnapshotStore, RedbSnapshotStore, SnapshotStore};
