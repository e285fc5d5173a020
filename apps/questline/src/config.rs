//! # Configuration
//!
//! `questline.toml` layout:
//!
//! ```toml
//! [storage]
//! path = "questline.redb"
//! backend = "redb"        # or "file"
//!
//! [engine]
//! warning_hour = 20
//! history_limit = 100
//!
//! [logging]
//! format = "text"         # or "json"
//! ```
//!
//! Every section and key is optional. A missing file yields the defaults.

use questline_core::{EngineConfig, QuestlineError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "questline.toml";

/// Largest configuration file accepted (64 KB).
const MAX_CONFIG_SIZE: u64 = 64 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// Snapshot storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID database via redb.
    #[default]
    Redb,
    /// One snapshot file, replaced atomically on save.
    File,
}

impl Backend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Redb => "redb",
            Backend::File => "file",
        }
    }
}

impl FromStr for Backend {
    type Err = QuestlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redb" => Ok(Backend::Redb),
            "file" => Ok(Backend::File),
            other => Err(QuestlineError::InvalidConfig(format!(
                "unknown backend '{other}'. Use: redb, file"
            ))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub backend: Backend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("questline.redb"),
            backend: Backend::Redb,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

// =============================================================================
// ROOT
// =============================================================================

/// Everything the binary can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestlineConfig {
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

impl QuestlineConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, QuestlineError> {
        let config: QuestlineConfig =
            toml::from_str(text).map_err(|e| QuestlineError::InvalidConfig(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load a configuration file. A file that does not exist yields defaults.
    pub fn load(path: &Path) -> Result<Self, QuestlineError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| QuestlineError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(QuestlineError::InvalidConfig(format!(
                "config file {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| QuestlineError::IoError(format!("Read config: {}", e)))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_default() {
        let config = QuestlineConfig::from_toml_str("").expect("parse");
        assert_eq!(config, QuestlineConfig::default());
        assert_eq!(config.engine.history_limit, 100);
        assert_eq!(config.storage.backend, Backend::Redb);
    }

    #[test]
    fn sections_are_partial() {
        let config = QuestlineConfig::from_toml_str(
            r#"
            [storage]
            backend = "file"

            [engine]
            warning_hour = 18
            "#,
        )
        .expect("parse");
        assert_eq!(config.storage.backend, Backend::File);
        assert_eq!(config.storage.path, PathBuf::from("questline.redb"));
        assert_eq!(config.engine.warning_hour, 18);
        assert_eq!(config.engine.history_limit, 100);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn invalid_engine_values_rejected() {
        let err = QuestlineConfig::from_toml_str("[engine]\nwarning_hour = 24\n");
        assert!(matches!(err, Err(QuestlineError::InvalidConfig(_))));
    }

    #[test]
    fn unknown_backend_rejected() {
        assert!(QuestlineConfig::from_toml_str("[storage]\nbackend = \"sqlite\"\n").is_err());
        assert!("sqlite".parse::<Backend>().is_err());
        assert_eq!("file".parse::<Backend>().expect("parse"), Backend::File);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let config = QuestlineConfig::load(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, QuestlineConfig::default());
    }
}
