//! Engine tuning knobs.

use crate::primitives::{WARNING_HOUR, XP_HISTORY_LIMIT};
use crate::types::QuestlineError;
use serde::{Deserialize, Serialize};

/// Runtime configuration for a `ProgressionStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Local hour (0-23) from which an inactive streak is reported at risk.
    pub warning_hour: u32,
    /// Number of XP events kept in history.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            warning_hour: WARNING_HOUR,
            history_limit: XP_HISTORY_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot honour.
    pub fn validate(&self) -> Result<(), QuestlineError> {
        if self.warning_hour > 23 {
            return Err(QuestlineError::InvalidConfig(format!(
                "warning_hour must be 0-23, got {}",
                self.warning_hour
            )));
        }
        if self.history_limit == 0 {
            return Err(QuestlineError::InvalidConfig(
                "history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
