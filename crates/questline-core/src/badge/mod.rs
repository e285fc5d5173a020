//! # Badges
//!
//! Static badge definitions, their unlock criteria, and the engine that
//! evaluates them against `UserMetrics`.
//!
//! - `criteria` - the typed unlock predicates
//! - `catalog` - the built-in badge catalog
//! - `engine` - unlock detection and progress reporting

mod catalog;
mod criteria;
mod engine;

pub use catalog::BADGES;
pub use criteria::Criteria;
pub use engine::{ActivityKind, BadgeEngine, BadgeProgress, BadgeUnlockResult, BadgeView};

use serde::{Deserialize, Serialize};

// =============================================================================
// RARITY & CATEGORY
// =============================================================================

/// Badge rarity. Determines the XP reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// XP granted on unlock.
    #[must_use]
    pub const fn xp_reward(&self) -> u64 {
        match self {
            Rarity::Common => 10,
            Rarity::Rare => 25,
            Rarity::Epic => 50,
            Rarity::Legendary => 100,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Learning,
    Quiz,
    Streak,
    Level,
    Speed,
    Mastery,
    Secret,
}

// =============================================================================
// DEFINITION
// =============================================================================

/// A badge in the static catalog. Never mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rarity: Rarity,
    pub category: BadgeCategory,
    pub hidden: bool,
    pub criteria: Criteria,
    pub xp_reward: u64,
}

impl BadgeDefinition {
    /// Create a visible badge whose XP reward follows its rarity.
    #[must_use]
    pub const fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        icon: &'static str,
        rarity: Rarity,
        category: BadgeCategory,
        criteria: Criteria,
    ) -> Self {
        Self {
            id,
            name,
            description,
            icon,
            rarity,
            category,
            hidden: false,
            criteria,
            xp_reward: rarity.xp_reward(),
        }
    }

    /// Mark as hidden: excluded from default listings until unlocked.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}
