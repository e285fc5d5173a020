//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Context;
use crate::storage::open_store;
use questline_core::{
    ActionOutcome, ActionParams, LevelSystem, MetricKey, MetricUpdate, ProgressionEvent,
    ProgressionStore, QuestlineError, Snapshot, SnapshotStore, XpCalculator, XpSource,
    snapshot_to_bytes,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Longest history listing.
const MAX_HISTORY_ROWS: usize = 100;

/// Most events one `metric ... record` invocation may log.
const MAX_RECORDED_EVENTS: u64 = 1_000;

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new progress database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), QuestlineError> {
    let storage = &ctx.config.storage;

    if storage.path.exists() {
        if !force {
            return Err(QuestlineError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&storage.path)
            .map_err(|e| QuestlineError::IoError(format!("Remove database: {}", e)))?;
    }

    let mut store = open_store(storage)?;
    store.save(&Snapshot::empty(ctx.clock.timestamp()))?;

    tracing::info!(
        path = %storage.path.display(),
        backend = %storage.backend,
        "database initialized"
    );
    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "database": storage.path.to_string_lossy(),
            "backend": storage.backend.as_str(),
        }));
    }
    println!(
        "Initialized new {} database at {:?}",
        storage.backend, storage.path
    );
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show level, XP and streak.
pub fn cmd_status(ctx: &Context) -> Result<(), QuestlineError> {
    let store = open_engine(ctx)?;
    let level = store.level_info();
    let streak = store.streak_data();

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "database": ctx.config.storage.path.to_string_lossy(),
            "backend": ctx.config.storage.backend.as_str(),
            "level": level,
            "title": level.title(),
            "streak": streak,
            "badges_unlocked": store.state().unlocked_badges.len(),
        }));
    }

    println!("Questline Status");
    println!("================");
    println!("Database: {:?}", ctx.config.storage.path);
    println!("Backend:  {}", ctx.config.storage.backend);
    println!();
    println!("Level:    {} ({})", level.level, level.title());
    println!(
        "XP:       {} total, {}% to next level",
        XpCalculator::format_xp(level.total_xp),
        level.progress_percent
    );
    if !level.is_max_level() {
        println!("          {} XP to go", level.xp_to_next_level);
    }
    println!(
        "Streak:   {} days (best {}), {} freezes",
        streak.current_streak, streak.longest_streak, streak.streak_freezes
    );
    if streak.is_at_risk {
        println!("          At risk: learn something today to keep it");
    }
    println!("Badges:   {}", store.state().unlocked_badges.len());

    Ok(())
}

// =============================================================================
// ACTION COMMANDS
// =============================================================================

/// Record a completed lesson.
pub fn cmd_lesson(
    ctx: &Context,
    score: u32,
    lesson: Option<String>,
    course: Option<String>,
    duration: Option<u64>,
    completes_course: bool,
) -> Result<(), QuestlineError> {
    let mut params = ActionParams::with_score(score);
    params.lesson_id = lesson;
    params.course_id = course;
    params.duration_secs = duration;
    params.completes_course = completes_course;

    let mut store = open_engine(ctx)?;
    let outcome = store.record_action(XpSource::Lesson, params);
    report_outcome(ctx, &store, &outcome)
}

/// Record a completed quiz.
pub fn cmd_quiz(
    ctx: &Context,
    score: u32,
    lesson: Option<String>,
    duration: Option<u64>,
) -> Result<(), QuestlineError> {
    let mut params = ActionParams::with_score(score);
    params.lesson_id = lesson;
    params.duration_secs = duration;

    let mut store = open_engine(ctx)?;
    let outcome = store.record_action(XpSource::Quiz, params);
    if outcome.xp_awarded == 0 && !ctx.json_mode {
        println!("Quiz recorded. Score {} is below the passing mark.", score);
    }
    report_outcome(ctx, &store, &outcome)
}

/// Record today's login.
pub fn cmd_login(ctx: &Context) -> Result<(), QuestlineError> {
    let mut store = open_engine(ctx)?;
    match store.record_daily_login() {
        Some(outcome) => report_outcome(ctx, &store, &outcome),
        None => {
            if ctx.json_mode {
                return print_json(&serde_json::json!({ "already_recorded": true }));
            }
            println!("Already active today.");
            Ok(())
        }
    }
}

/// Grant raw XP from any source.
pub fn cmd_grant(ctx: &Context, amount: i64, source: XpSource) -> Result<(), QuestlineError> {
    let mut store = open_engine(ctx)?;
    let outcome = store.record_action(source, ActionParams::with_amount(amount));
    report_outcome(ctx, &store, &outcome)
}

// =============================================================================
// STREAK COMMANDS
// =============================================================================

/// Spend a streak freeze.
pub fn cmd_freeze(ctx: &Context) -> Result<(), QuestlineError> {
    let mut store = open_engine(ctx)?;
    let before = store.streak_data();
    let used = store.use_streak_freeze();
    let remaining = store.state().streak.streak_freezes;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "used": used,
            "remaining": remaining,
        }));
    }

    if used {
        println!(
            "Streak freeze used. {} day streak protected, {} freezes left.",
            before.current_streak, remaining
        );
    } else if before.streak_freezes == 0 {
        println!("No streak freezes available.");
    } else if before.freeze_used_today {
        println!("A freeze already protects today.");
    } else if before.active_today {
        println!("Already active today; no freeze needed.");
    } else {
        println!("No streak to protect.");
    }
    Ok(())
}

/// Award streak freezes.
pub fn cmd_award_freezes(ctx: &Context, count: u32, reason: &str) -> Result<(), QuestlineError> {
    let mut store = open_engine(ctx)?;
    let awarded = store.award_freezes(count, reason);
    let held = store.state().streak.streak_freezes;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "requested": count,
            "awarded": awarded,
            "held": held,
        }));
    }
    println!("Awarded {} of {} freezes. Now holding {}.", awarded, count, held);
    Ok(())
}

/// Refresh and show the at-risk flag.
pub fn cmd_check_streak(ctx: &Context) -> Result<(), QuestlineError> {
    let mut store = open_engine(ctx)?;
    let status = store.check_streak();
    let data = store.streak_data();

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "status": status,
            "streak": data,
        }));
    }

    println!("Streak:       {} days", data.current_streak);
    println!("Active today: {}", status.active_today);
    println!("At risk:      {}", status.is_at_risk);
    println!("Can freeze:   {}", status.can_use_freeze);
    println!("Bonus:        +{}% XP", data.bonus_percent);
    if let (Some(milestone), Some(days)) = (data.next_milestone, data.days_until_next_milestone) {
        println!("Next:         {} in {} days", milestone.title, days);
    }
    Ok(())
}

// =============================================================================
// METRIC COMMAND
// =============================================================================

/// Apply a metric update from the host.
pub fn cmd_metric(ctx: &Context, name: &str, op: &str, value: u64) -> Result<(), QuestlineError> {
    let key = MetricKey::from_name(name).ok_or_else(|| {
        QuestlineError::InvalidInput(format!("Unknown metric: {}", name))
    })?;

    let updates = match op {
        "set" => vec![MetricUpdate::Set { key, value }],
        "increment" => vec![MetricUpdate::Increment { key, by: value }],
        "best" => vec![MetricUpdate::Best { key, value }],
        "record" => {
            if value > MAX_RECORDED_EVENTS {
                return Err(QuestlineError::InvalidInput(format!(
                    "Cannot record {} events at once (maximum {})",
                    value, MAX_RECORDED_EVENTS
                )));
            }
            let at = ctx.clock.timestamp();
            (0..value).map(|_| MetricUpdate::Record { key, at }).collect()
        }
        _ => {
            return Err(QuestlineError::InvalidInput(format!(
                "Unknown metric operation: {}. Use: set, increment, best, record",
                op
            )));
        }
    };

    if key.is_derived() {
        tracing::warn!(metric = %key, "metric is maintained by the engine; update ignored");
    }

    let mut store = open_engine(ctx)?;
    let outcome = store.update_badge_metrics(&updates);
    if !ctx.json_mode {
        println!("{} = {}", key, store.metrics().value(key));
    }
    report_outcome(ctx, &store, &outcome)
}

// =============================================================================
// BADGE COMMANDS
// =============================================================================

/// List badges.
pub fn cmd_badges(ctx: &Context, include_hidden: bool) -> Result<(), QuestlineError> {
    let store = open_engine(ctx)?;
    let views = store.badges(include_hidden);

    if ctx.json_mode {
        return print_json(&views);
    }

    let unlocked = views.iter().filter(|v| v.unlocked).count();
    println!("Badges ({} of {} unlocked)", unlocked, views.len());
    println!("======");
    for view in &views {
        let mark = if view.unlocked { "x" } else { " " };
        if view.concealed {
            println!("[{}] ???  (secret)", mark);
        } else {
            println!(
                "[{}] {} {} [{}] - {}",
                mark,
                view.badge.icon,
                view.badge.name,
                view.badge.rarity.as_str(),
                view.badge.description
            );
        }
    }
    Ok(())
}

/// Show progress toward one badge.
pub fn cmd_progress(ctx: &Context, badge_id: &str) -> Result<(), QuestlineError> {
    let store = open_engine(ctx)?;
    let progress = store
        .badge_progress(badge_id)
        .ok_or_else(|| QuestlineError::InvalidInput(format!("Unknown badge: {}", badge_id)))?;

    let concealed = progress.hidden && !progress.unlocked;

    if ctx.json_mode {
        if concealed {
            return print_json(&serde_json::json!({
                "badge_id": progress.badge_id,
                "progress_percent": progress.progress_percent,
                "unlocked": false,
                "hidden": true,
            }));
        }
        return print_json(&progress);
    }

    if concealed {
        println!("{}: secret badge, {}%", badge_id, progress.progress_percent);
        return Ok(());
    }
    println!(
        "{}: {} / {} ({}%){}",
        badge_id,
        progress.current_value,
        progress.target_value,
        progress.progress_percent,
        if progress.unlocked { ", unlocked" } else { "" }
    );
    Ok(())
}

// =============================================================================
// STATS & HISTORY COMMANDS
// =============================================================================

/// Show aggregate statistics.
pub fn cmd_stats(ctx: &Context) -> Result<(), QuestlineError> {
    let store = open_engine(ctx)?;
    let stats = store.stats();

    if ctx.json_mode {
        return print_json(&stats);
    }

    println!("Questline Statistics");
    println!("====================");
    println!("Level:            {} ({})", stats.level, stats.title);
    println!("Total XP:         {}", stats.total_xp);
    println!("XP today:         {}", stats.xp_today);
    println!(
        "Streak:           {} days (best {})",
        stats.current_streak, stats.longest_streak
    );
    println!("Freezes:          {}", stats.streak_freezes);
    println!(
        "Badges:           {} / {}",
        stats.badges_unlocked, stats.badges_total
    );
    println!("Lessons:          {}", stats.lessons_completed);
    println!(
        "Quizzes:          {} ({} perfect)",
        stats.quizzes_completed, stats.perfect_quizzes
    );
    println!("Courses:          {}", stats.courses_completed);
    println!("Daily logins:     {}", stats.daily_logins);
    if !stats.xp_by_source.is_empty() {
        println!();
        println!("XP by source (recent history):");
        for (source, xp) in &stats.xp_by_source {
            println!("  {:<14} {}", source.as_str(), xp);
        }
    }
    Ok(())
}

/// Show recent XP awards.
pub fn cmd_history(ctx: &Context, limit: usize) -> Result<(), QuestlineError> {
    let limit = limit.min(MAX_HISTORY_ROWS);
    let store = open_engine(ctx)?;
    let events: Vec<_> = store.history().take(limit).collect();

    if ctx.json_mode {
        return print_json(&events);
    }

    if events.is_empty() {
        println!("No XP earned yet.");
        return Ok(());
    }
    for event in events {
        let subject = event
            .lesson_id
            .as_deref()
            .or(event.course_id.as_deref())
            .unwrap_or("-");
        println!(
            "{}  +{:<5} {:<14} {}",
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.amount,
            event.source.as_str(),
            subject
        );
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the current snapshot.
pub fn cmd_export(ctx: &Context, output: &Path, format: &str) -> Result<(), QuestlineError> {
    let validated_output = validate_output_path(output)?;
    let store = open_engine(ctx)?;
    let snapshot = store.snapshot();

    let data = match format {
        "json" => serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| QuestlineError::SerializationError(e.to_string()))?,
        "binary" => snapshot_to_bytes(&snapshot)?,
        _ => {
            return Err(QuestlineError::SerializationError(format!(
                "Unknown format: {}. Use: json, binary",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| QuestlineError::IoError(format!("Write file: {}", e)))?;

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "path": validated_output.to_string_lossy(),
            "bytes": data.len(),
            "format": format,
        }));
    }
    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured storage and start a session on it.
///
/// A snapshot that exists but cannot be read is an error here: the store
/// would otherwise start fresh and overwrite it on the next save.
pub fn open_engine(ctx: &Context) -> Result<ProgressionStore, QuestlineError> {
    let storage = open_store(&ctx.config.storage)?;
    storage.load()?;

    let mut store = ProgressionStore::with_config(Arc::clone(&ctx.clock), ctx.config.engine)
        .with_persistence(storage);
    let start = store.start_session();

    if let Some(previous) = start.broken_streak {
        if !ctx.json_mode {
            println!("Your {}-day streak has ended. Start a new one today!", previous);
        }
    }
    Ok(store)
}

/// Print an action outcome in the selected format.
fn report_outcome(
    ctx: &Context,
    store: &ProgressionStore,
    outcome: &ActionOutcome,
) -> Result<(), QuestlineError> {
    let state = store.state();

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "xp_awarded": outcome.xp_awarded,
            "events": outcome.events,
            "total_xp": state.total_xp,
            "level": state.level,
            "current_streak": state.streak.current_streak,
        }));
    }

    for event in &outcome.events {
        println!("{}", describe(event));
    }
    println!(
        "Level {} | {} XP | {}-day streak",
        state.level, state.total_xp, state.streak.current_streak
    );
    Ok(())
}

/// One line of text for an event.
pub fn describe(event: &ProgressionEvent) -> String {
    match event {
        ProgressionEvent::XpEarned { amount, source, .. } => {
            format!("+{} XP ({})", amount, source.as_str())
        }
        ProgressionEvent::LevelUp {
            new_level,
            previous_level,
            ..
        } => format!(
            "Level up! {} -> {} ({})",
            previous_level,
            new_level,
            LevelSystem::title_for_level(*new_level)
        ),
        ProgressionEvent::BadgeUnlocked {
            badge_name, rarity, ..
        } => format!("Badge unlocked: {} [{}]", badge_name, rarity.as_str()),
        ProgressionEvent::StreakUpdated {
            current_streak,
            is_new_record,
            ..
        } => {
            if *is_new_record {
                format!("Streak: {} days (new record)", current_streak)
            } else {
                format!("Streak: {} days", current_streak)
            }
        }
        ProgressionEvent::StreakBroken {
            previous_streak, ..
        } => format!("Streak of {} days ended", previous_streak),
        ProgressionEvent::DailyLogin {
            consecutive_days, ..
        } => format!("Daily login, day {}", consecutive_days),
        ProgressionEvent::FreezeUsed { remaining } => {
            format!("Streak freeze used, {} left", remaining)
        }
        ProgressionEvent::FreezesAwarded { count, reason } => {
            format!("+{} streak freezes ({})", count, reason)
        }
        ProgressionEvent::MilestoneReached { days, title } => {
            format!("Milestone reached: {} ({} days)", title, days)
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<(), QuestlineError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| QuestlineError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, QuestlineError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        QuestlineError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(QuestlineError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| QuestlineError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}
