//! # Questline CLI Module
//!
//! This module implements the CLI interface for Questline.
//!
//! ## Available Commands
//!
//! - `init` - Create an empty progress database
//! - `status` - Show level, XP and streak
//! - `lesson` / `quiz` / `login` / `grant` - Record learner actions
//! - `freeze` / `award-freezes` / `check-streak` - Streak maintenance
//! - `metric` - Update a badge metric
//! - `badges` / `progress` - Badge listing and progress
//! - `stats` / `history` - Aggregates and recent XP
//! - `export` - Write the current snapshot to a file

mod commands;

use crate::config::{Backend, DEFAULT_CONFIG_FILE, QuestlineConfig};
use clap::{Parser, Subcommand};
use questline_core::{Clock, QuestlineError, SystemClock, XpSource};
use std::path::PathBuf;
use std::sync::Arc;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Questline - progression engine for learning platforms
///
/// Turns lessons, quizzes and daily logins into XP, levels, streaks and badges.
#[derive(Parser, Debug)]
#[command(name = "questline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the progress database (overrides [storage] path)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "file" (single snapshot file)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty progress database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show level, XP and streak
    Status,

    /// Record a completed lesson
    Lesson {
        /// Score in percent
        #[arg(short, long, default_value = "100")]
        score: u32,

        /// Lesson identifier
        #[arg(long)]
        lesson: Option<String>,

        /// Course identifier
        #[arg(long)]
        course: Option<String>,

        /// Completion time in seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// The lesson finished its course
        #[arg(long)]
        completes_course: bool,
    },

    /// Record a completed quiz
    Quiz {
        /// Score in percent
        #[arg(short, long)]
        score: u32,

        /// Lesson the quiz belongs to
        #[arg(long)]
        lesson: Option<String>,

        /// Completion time in seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Record today's login
    Login,

    /// Grant raw XP (negative amounts grant nothing)
    Grant {
        /// XP amount
        #[arg(allow_hyphen_values = true)]
        amount: i64,

        /// XP source (achievement, challenge, streak_bonus, ...)
        #[arg(short, long, default_value = "achievement")]
        source: XpSource,
    },

    /// Spend a streak freeze to protect today
    Freeze,

    /// Award streak freezes (capped at five held)
    AwardFreezes {
        /// Number of freezes
        count: u32,

        /// Reason shown in the event
        #[arg(short, long, default_value = "reward")]
        reason: String,
    },

    /// Update a badge metric
    Metric {
        /// Metric name (e.g. night_sessions, fastest_quiz_seconds)
        name: String,

        /// Operation (set, increment, best, record)
        #[arg(short, long, default_value = "increment")]
        op: String,

        /// Value; for `record` the number of events to log
        #[arg(short, long, default_value = "1")]
        value: u64,
    },

    /// List badges
    Badges {
        /// Include hidden badges
        #[arg(short, long)]
        all: bool,
    },

    /// Show progress toward one badge
    Progress {
        /// Badge identifier
        badge: String,
    },

    /// Show aggregate statistics
    Stats,

    /// Show recent XP awards
    History {
        /// Number of entries
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Check whether the streak is at risk today
    CheckStreak,

    /// Export the current snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (json, binary)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Resolved settings every command runs with.
pub struct Context {
    pub config: QuestlineConfig,
    pub json_mode: bool,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    /// A context reading the system clock.
    #[must_use]
    pub fn new(config: QuestlineConfig, json_mode: bool) -> Self {
        Self::with_clock(config, json_mode, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: QuestlineConfig, json_mode: bool, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            json_mode,
            clock,
        }
    }
}

/// Load the configuration file and apply command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<QuestlineConfig, QuestlineError> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = QuestlineConfig::load(&path)?;

    if let Some(database) = &cli.database {
        config.storage.path = database.clone();
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    Ok(config)
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute a parsed command.
pub fn execute(ctx: &Context, command: Option<Commands>) -> Result<(), QuestlineError> {
    match command {
        Some(Commands::Init { force }) => cmd_init(ctx, force),
        Some(Commands::Status) => cmd_status(ctx),
        Some(Commands::Lesson {
            score,
            lesson,
            course,
            duration,
            completes_course,
        }) => cmd_lesson(ctx, score, lesson, course, duration, completes_course),
        Some(Commands::Quiz {
            score,
            lesson,
            duration,
        }) => cmd_quiz(ctx, score, lesson, duration),
        Some(Commands::Login) => cmd_login(ctx),
        Some(Commands::Grant { amount, source }) => cmd_grant(ctx, amount, source),
        Some(Commands::Freeze) => cmd_freeze(ctx),
        Some(Commands::AwardFreezes { count, reason }) => cmd_award_freezes(ctx, count, &reason),
        Some(Commands::Metric { name, op, value }) => cmd_metric(ctx, &name, &op, value),
        Some(Commands::Badges { all }) => cmd_badges(ctx, all),
        Some(Commands::Progress { badge }) => cmd_progress(ctx, &badge),
        Some(Commands::Stats) => cmd_stats(ctx),
        Some(Commands::History { limit }) => cmd_history(ctx, limit),
        Some(Commands::CheckStreak) => cmd_check_streak(ctx),
        Some(Commands::Export { output, format }) => cmd_export(ctx, &output, &format),
        None => {
            // No subcommand - show status by default
            cmd_status(ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "questline",
            "lesson",
            "--score",
            "90",
            "--backend",
            "file",
            "--json-mode",
        ])
        .expect("parse");
        assert_eq!(cli.backend, Some(Backend::File));
        assert!(cli.json_mode);
        assert!(matches!(
            cli.command,
            Some(Commands::Lesson { score: 90, .. })
        ));
    }

    #[test]
    fn grant_accepts_negative_amount_and_source() {
        let cli = Cli::try_parse_from(["questline", "grant", "-15", "--source", "challenge"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Grant {
                amount: -15,
                source: XpSource::Challenge
            })
        ));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["questline", "--backend", "sqlite"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let config_path = dir.path().join("questline.toml");
        std::fs::write(
            &config_path,
            "[storage]\npath = \"from-file.redb\"\nbackend = \"file\"\n",
        )
        .expect("write");

        let cli = Cli::try_parse_from([
            "questline",
            "--config",
            config_path.to_str().expect("utf-8 path"),
            "--backend",
            "redb",
        ])
        .expect("parse");
        let config = resolve_config(&cli).expect("resolve");

        assert_eq!(config.storage.path, PathBuf::from("from-file.redb"));
        assert_eq!(config.storage.backend, Backend::Redb);
    }
}
