//! # Progression Store
//!
//! The single owner of a learner's progression state.
//!
//! Every mutation follows the same path:
//!
//! 1. Compute rewards from the state as it was before the call
//! 2. Commit XP, level, streak, metrics and badge unlocks
//! 3. Persist a snapshot (failures are logged, never rolled back)
//! 4. Emit the collected events, in order, to subscribed listeners
//!
//! The store never hands out mutable access to its state. Hosts that share
//! it between threads wrap the whole store in one `Mutex`.

use crate::badge::{ActivityKind, BadgeDefinition, BadgeEngine, BadgeProgress, BadgeView};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::events::{EventDispatcher, ProgressionEvent, Subscription};
use crate::formats::Snapshot;
use crate::level::{LevelInfo, LevelSystem};
use crate::metrics::{MetricKey, MetricUpdate, UserMetrics};
use crate::primitives::{
    EARLY_SESSION_END_HOUR, EARLY_SESSION_START_HOUR, FORMAT_VERSION, MAX_FREEZES,
    NIGHT_SESSION_END_HOUR, NIGHT_SESSION_START_HOUR, PERFECT_SCORE,
};
use crate::storage::SnapshotStore;
use crate::streak::{
    FreezeOutcome, StreakEngine, StreakMilestone, StreakState, StreakStatus, StreakUpdate,
};
use crate::types::{QuestlineError, UnlockedBadges, XpEvent, XpSource};
use crate::xp::XpCalculator;
use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

// =============================================================================
// STATE
// =============================================================================

/// Authoritative progression state.
///
/// `level`, `current_xp`, `xp_to_next_level` and `progress_percent` always
/// equal `LevelSystem::level_for(total_xp)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionState {
    pub total_xp: u64,
    pub level: u32,
    pub current_xp: u64,
    pub xp_to_next_level: u64,
    pub progress_percent: u8,
    pub streak: StreakState,
    pub unlocked_badges: UnlockedBadges,
    /// Most recent first.
    pub xp_history: VecDeque<XpEvent>,
}

impl Default for ProgressionState {
    fn default() -> Self {
        let mut state = Self {
            total_xp: 0,
            level: 1,
            current_xp: 0,
            xp_to_next_level: 0,
            progress_percent: 0,
            streak: StreakState::default(),
            unlocked_badges: UnlockedBadges::new(),
            xp_history: VecDeque::new(),
        };
        state.set_total_xp(0);
        state
    }
}

impl ProgressionState {
    fn set_total_xp(&mut self, total_xp: u64) {
        let info = LevelSystem::level_for(total_xp);
        self.total_xp = info.total_xp;
        self.level = info.level;
        self.current_xp = info.current_xp;
        self.xp_to_next_level = info.xp_to_next_level;
        self.progress_percent = info.progress_percent;
    }

    #[must_use]
    pub fn level_info(&self) -> LevelInfo {
        LevelInfo {
            level: self.level,
            current_xp: self.current_xp,
            xp_to_next_level: self.xp_to_next_level,
            total_xp: self.total_xp,
            progress_percent: self.progress_percent,
        }
    }
}

// =============================================================================
// INPUTS & OUTCOMES
// =============================================================================

/// Facts about a learner action, already validated by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    /// Score in percent for lessons and quizzes.
    pub score: Option<u32>,
    pub lesson_id: Option<String>,
    pub course_id: Option<String>,
    /// Raw XP for grants (achievements, challenges). Negative values clamp to 0.
    pub amount: Option<i64>,
    /// Completion time, feeding the fastest-time metrics.
    pub duration_secs: Option<u64>,
    /// The lesson finished its course.
    pub completes_course: bool,
}

impl ActionParams {
    #[must_use]
    pub fn with_score(score: u32) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_amount(amount: i64) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn lesson(mut self, lesson_id: impl Into<String>) -> Self {
        self.lesson_id = Some(lesson_id.into());
        self
    }

    #[must_use]
    pub fn course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    #[must_use]
    pub fn duration(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn completing_course(mut self) -> Self {
        self.completes_course = true;
        self
    }
}

/// What a mutating call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// All XP added by the call, badge rewards included.
    pub xp_awarded: u64,
    /// Events delivered to listeners, in emission order.
    pub events: Vec<ProgressionEvent>,
}

impl ActionOutcome {
    /// `(previous_level, new_level)` if the call crossed a level boundary.
    #[must_use]
    pub fn level_up(&self) -> Option<(u32, u32)> {
        self.events.iter().find_map(|event| match event {
            ProgressionEvent::LevelUp {
                new_level,
                previous_level,
                ..
            } => Some((*previous_level, *new_level)),
            _ => None,
        })
    }

    /// Ids of badges unlocked by the call.
    #[must_use]
    pub fn unlocked_badges(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProgressionEvent::BadgeUnlocked { badge_id, .. } => Some(badge_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Result of `start_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStart {
    /// A stored snapshot was loaded.
    pub restored: bool,
    /// Streak length that lapsed since the last session.
    pub broken_streak: Option<u32>,
}

/// Streak summary for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakData {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub streak_freezes: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub active_today: bool,
    pub is_at_risk: bool,
    pub can_use_freeze: bool,
    pub freeze_used_today: bool,
    pub bonus_percent: u64,
    pub next_milestone: Option<&'static StreakMilestone>,
    pub days_until_next_milestone: Option<u32>,
}

/// Aggregate numbers for a profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionStats {
    pub total_xp: u64,
    pub level: u32,
    pub title: &'static str,
    pub progress_percent: u8,
    pub xp_to_next_level: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub streak_freezes: u32,
    pub badges_unlocked: usize,
    pub badges_total: usize,
    pub lessons_completed: u64,
    pub quizzes_completed: u64,
    pub perfect_quizzes: u64,
    pub courses_completed: u64,
    pub daily_logins: u64,
    /// XP earned on the current local day, from history.
    pub xp_today: u64,
    /// XP per source over the retained history.
    pub xp_by_source: BTreeMap<XpSource, u64>,
}

// =============================================================================
// INTERNALS
// =============================================================================

/// Badge checks narrowed by activity, or the whole catalog.
#[derive(Debug, Clone, Copy)]
enum Scope {
    All,
    Kinds(&'static [ActivityKind]),
}

/// Metrics moved by badge rewards.
const CASCADE: Scope = Scope::Kinds(&[ActivityKind::XpEarned, ActivityKind::BadgeUnlocked]);

/// Events collected during one call, grouped so they emit in a fixed order:
/// XP, level-up, badges, streak.
struct Pending {
    level_before: u32,
    xp_awarded: u64,
    xp: Vec<ProgressionEvent>,
    badges: Vec<ProgressionEvent>,
    streak: Vec<ProgressionEvent>,
}

impl Pending {
    fn new(level_before: u32) -> Self {
        Self {
            level_before,
            xp_awarded: 0,
            xp: Vec::new(),
            badges: Vec::new(),
            streak: Vec::new(),
        }
    }

    fn into_events(self, state: &ProgressionState) -> Vec<ProgressionEvent> {
        let mut events = self.xp;
        if state.level > self.level_before {
            events.push(ProgressionEvent::LevelUp {
                new_level: state.level,
                previous_level: self.level_before,
                total_xp: state.total_xp,
            });
        }
        events.extend(self.badges);
        events.extend(self.streak);
        events
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Orchestrates the rule engines over one learner's state.
pub struct ProgressionStore {
    state: ProgressionState,
    metrics: UserMetrics,
    clock: Arc<dyn Clock>,
    streaks: StreakEngine,
    badges: BadgeEngine,
    config: EngineConfig,
    dispatcher: EventDispatcher,
    persistence: Option<Box<dyn SnapshotStore>>,
}

impl std::fmt::Debug for ProgressionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionStore")
            .field("total_xp", &self.state.total_xp)
            .field("level", &self.state.level)
            .field("current_streak", &self.state.streak.current_streak)
            .field("badges", &self.state.unlocked_badges.len())
            .field("config", &self.config)
            .field("persistent", &self.persistence.is_some())
            .finish_non_exhaustive()
    }
}

impl ProgressionStore {
    /// Create a store with default configuration and no persistence.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let config = EngineConfig {
            warning_hour: config.warning_hour.min(23),
            history_limit: config.history_limit.max(1),
        };
        let mut store = Self {
            state: ProgressionState::default(),
            metrics: UserMetrics::new(),
            streaks: StreakEngine::with_warning_hour(Arc::clone(&clock), config.warning_hour),
            clock,
            badges: BadgeEngine::new(),
            config,
            dispatcher: EventDispatcher::new(),
            persistence: None,
        };
        store.sync_derived_metrics();
        store
    }

    /// Evaluate a different badge catalog.
    #[must_use]
    pub fn with_badge_engine(mut self, badges: BadgeEngine) -> Self {
        self.badges = badges;
        self
    }

    /// Attach a snapshot store. Nothing is loaded until `start_session`.
    #[must_use]
    pub fn with_persistence(mut self, persistence: impl SnapshotStore + 'static) -> Self {
        self.persistence = Some(Box::new(persistence));
        self
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    /// Restore the stored snapshot, if any, and reset a lapsed streak.
    pub fn start_session(&mut self) -> SessionStart {
        let restored = self.load_snapshot();

        let Some(lapsed) = self.streaks.check_and_break(&self.state.streak) else {
            return SessionStart {
                restored,
                broken_streak: None,
            };
        };

        tracing::info!(
            previous_streak = lapsed.previous_streak,
            longest_streak = lapsed.longest_streak,
            "streak broken"
        );
        let mut pending = Pending::new(self.state.level);
        self.state.streak = lapsed.state;
        pending.streak.push(ProgressionEvent::StreakBroken {
            previous_streak: lapsed.previous_streak,
            longest_streak: lapsed.longest_streak,
        });
        self.finish(pending);

        SessionStart {
            restored,
            broken_streak: Some(lapsed.previous_streak),
        }
    }

    fn load_snapshot(&mut self) -> bool {
        let Some(persistence) = self.persistence.as_ref() else {
            return false;
        };
        match persistence.load() {
            Ok(Some(snapshot)) => match self.restore(snapshot) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "stored snapshot rejected; starting fresh");
                    false
                }
            },
            Ok(None) => {
                tracing::debug!("no stored snapshot");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load snapshot; starting fresh");
                false
            }
        }
    }

    /// Replace the in-memory state with a snapshot.
    ///
    /// Derived level fields are recomputed, the freeze count is capped, and
    /// history is trimmed to the configured limit. No events are emitted.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), QuestlineError> {
        if snapshot.version > FORMAT_VERSION {
            return Err(QuestlineError::InvalidInput(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, FORMAT_VERSION
            )));
        }

        let mut state = ProgressionState::default();
        state.set_total_xp(snapshot.total_xp);
        state.streak = StreakState {
            current_streak: snapshot.current_streak,
            longest_streak: snapshot.longest_streak.max(snapshot.current_streak),
            last_activity_date: snapshot.last_activity_date,
            streak_freezes: snapshot.streak_freezes.min(MAX_FREEZES),
            freeze_active_date: snapshot.freeze_active_date,
            is_at_risk: false,
        };
        for id in &snapshot.unlocked_badges {
            let at = snapshot
                .badge_unlocked_at
                .get(id)
                .copied()
                .unwrap_or(snapshot.updated_at);
            state.unlocked_badges.insert(id, at);
        }
        state.xp_history = snapshot
            .xp_history
            .into_iter()
            .take(self.config.history_limit)
            .collect();

        self.state = state;
        self.metrics = snapshot.metrics;
        self.sync_derived_metrics();

        tracing::info!(
            total_xp = self.state.total_xp,
            level = self.state.level,
            current_streak = self.state.streak.current_streak,
            "snapshot restored"
        );
        Ok(())
    }

    /// The persisted subset of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = &self.state;
        Snapshot {
            version: FORMAT_VERSION,
            total_xp: state.total_xp,
            current_streak: state.streak.current_streak,
            longest_streak: state.streak.longest_streak,
            last_activity_date: state.streak.last_activity_date,
            streak_freezes: state.streak.streak_freezes,
            freeze_active_date: state.streak.freeze_active_date,
            unlocked_badges: state.unlocked_badges.ids().map(str::to_string).collect(),
            badge_unlocked_at: state
                .unlocked_badges
                .iter()
                .map(|(id, at)| (id.to_string(), at))
                .collect(),
            xp_history: state.xp_history.iter().cloned().collect(),
            metrics: self.metrics.clone(),
            updated_at: self.clock.timestamp(),
        }
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Record a learner action and award its XP.
    ///
    /// The streak bonus is based on the streak before this action, so the
    /// action that reaches a new tier does not receive that tier's bonus.
    pub fn record_action(&mut self, source: XpSource, params: ActionParams) -> ActionOutcome {
        if source == XpSource::DailyLogin {
            return self.record_daily_login().unwrap_or_default();
        }

        let mut pending = Pending::new(self.state.level);
        let amount = action_xp(source, &params, self.state.streak.current_streak);
        tracing::debug!(%source, amount, "action recorded");
        self.grant_xp(
            amount,
            source,
            params.lesson_id.clone(),
            params.course_id.clone(),
            &mut pending,
        );

        if source.counts_as_activity() {
            let update = self.streaks.record_activity(&self.state.streak);
            self.commit_streak_update(update, &mut pending);
            self.record_session_time();
        }
        self.record_activity_metrics(source, &params);
        self.sync_derived_metrics();
        self.evaluate_badges(Scope::Kinds(activity_kinds(source)), &mut pending);

        self.finish(pending)
    }

    /// Record the first login of the day.
    ///
    /// Returns `None` without touching state if there was already activity
    /// today.
    pub fn record_daily_login(&mut self) -> Option<ActionOutcome> {
        let today = self.clock.today();
        if self.state.streak.is_active_on(today) {
            tracing::debug!(%today, "already active today");
            return None;
        }

        let mut pending = Pending::new(self.state.level);
        let update = self.streaks.record_activity(&self.state.streak);
        let consecutive_days = update.state.current_streak;
        pending.streak.push(ProgressionEvent::DailyLogin {
            date: today,
            consecutive_days,
        });
        self.commit_streak_update(update, &mut pending);
        self.metrics.increment(MetricKey::DailyLogins, 1);

        let xp = XpCalculator::daily_login_xp(consecutive_days);
        self.grant_xp(xp, XpSource::DailyLogin, None, None, &mut pending);
        self.evaluate_badges(
            Scope::Kinds(&[ActivityKind::DailyLogin, ActivityKind::XpEarned]),
            &mut pending,
        );

        Some(self.finish(pending))
    }

    /// Unlock a badge directly. Unknown or already unlocked ids change nothing.
    pub fn unlock_badge(&mut self, badge_id: &str) -> bool {
        let Some(badge) = self.badges.find(badge_id) else {
            tracing::debug!(badge = badge_id, "unknown badge id");
            return false;
        };
        if self.state.unlocked_badges.contains(badge.id) {
            return false;
        }

        let mut pending = Pending::new(self.state.level);
        self.apply_unlock(badge, &mut pending);
        self.evaluate_badges(CASCADE, &mut pending);
        self.finish(pending);
        true
    }

    /// Spend a freeze to protect today's streak.
    pub fn use_streak_freeze(&mut self) -> bool {
        match self.streaks.use_freeze(&self.state.streak) {
            FreezeOutcome::Denied(reason) => {
                tracing::debug!(%reason, "streak freeze denied");
                false
            }
            FreezeOutcome::Applied { state, remaining } => {
                let mut pending = Pending::new(self.state.level);
                self.state.streak = state;
                self.metrics.increment(MetricKey::FreezesUsed, 1);
                pending
                    .streak
                    .push(ProgressionEvent::FreezeUsed { remaining });
                self.evaluate_badges(Scope::Kinds(&[ActivityKind::Streak]), &mut pending);
                self.finish(pending);
                true
            }
        }
    }

    /// Grant freezes, capped at `MAX_FREEZES`. Returns how many were added.
    pub fn award_freezes(&mut self, count: u32, reason: &str) -> u32 {
        let (mut next, awarded) = self.streaks.award_freezes(&self.state.streak, count);
        next.streak_freezes = next.streak_freezes.min(MAX_FREEZES);
        if awarded == 0 {
            tracing::debug!(count, reason, "no freezes awarded");
            return 0;
        }

        let mut pending = Pending::new(self.state.level);
        self.state.streak = next;
        pending.streak.push(ProgressionEvent::FreezesAwarded {
            count: awarded,
            reason: reason.to_string(),
        });
        self.finish(pending);
        awarded
    }

    /// Apply host metric updates and run a full unlock scan.
    ///
    /// Metrics the store derives from its own state (total XP, level,
    /// streaks, badge count) cannot be written this way.
    pub fn update_badge_metrics(&mut self, updates: &[MetricUpdate]) -> ActionOutcome {
        let mut pending = Pending::new(self.state.level);
        for update in updates {
            if update.key().is_derived() {
                tracing::debug!(metric = %update.key(), "derived metric update ignored");
                continue;
            }
            self.metrics.apply(update);
        }
        self.sync_derived_metrics();
        self.evaluate_badges(Scope::All, &mut pending);
        self.finish(pending)
    }

    /// Periodic tick. Only the at-risk flag may change.
    pub fn check_streak(&mut self) -> StreakStatus {
        let status = self.streaks.check_status(&self.state.streak);
        if self.state.streak.is_at_risk != status.is_at_risk {
            self.state.streak.is_at_risk = status.is_at_risk;
            if status.is_at_risk {
                tracing::info!(
                    current_streak = self.state.streak.current_streak,
                    "streak at risk"
                );
            }
            self.persist();
        }
        status
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    #[must_use]
    pub fn metrics(&self) -> &UserMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn level_info(&self) -> LevelInfo {
        self.state.level_info()
    }

    #[must_use]
    pub fn streak_data(&self) -> StreakData {
        let streak = &self.state.streak;
        let status = self.streaks.check_status(streak);
        let today = self.clock.today();
        StreakData {
            current_streak: streak.current_streak,
            longest_streak: streak.longest_streak,
            streak_freezes: streak.streak_freezes,
            last_activity_date: streak.last_activity_date,
            active_today: status.active_today,
            is_at_risk: status.is_at_risk,
            can_use_freeze: status.can_use_freeze,
            freeze_used_today: streak.freeze_used_on(today),
            bonus_percent: StreakEngine::streak_bonus_percent(streak.current_streak),
            next_milestone: StreakEngine::next_milestone(streak.current_streak),
            days_until_next_milestone: StreakEngine::days_until_next_milestone(
                streak.current_streak,
            ),
        }
    }

    #[must_use]
    pub fn badge_progress(&self, badge_id: &str) -> Option<BadgeProgress> {
        self.badges
            .progress(badge_id, &self.metrics, &self.state.unlocked_badges)
    }

    #[must_use]
    pub fn badges(&self, include_hidden: bool) -> Vec<BadgeView> {
        self.badges.badges(include_hidden, &self.state.unlocked_badges)
    }

    /// XP events, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &XpEvent> + '_ {
        self.state.xp_history.iter()
    }

    #[must_use]
    pub fn stats(&self) -> ProgressionStats {
        let now = self.clock.now();
        let offset = *now.offset();
        let today = now.date_naive();

        let mut xp_today = 0u64;
        let mut xp_by_source: BTreeMap<XpSource, u64> = BTreeMap::new();
        for event in &self.state.xp_history {
            if event.timestamp.with_timezone(&offset).date_naive() == today {
                xp_today = xp_today.saturating_add(event.amount);
            }
            let entry = xp_by_source.entry(event.source).or_insert(0);
            *entry = entry.saturating_add(event.amount);
        }

        let level = self.level_info();
        ProgressionStats {
            total_xp: level.total_xp,
            level: level.level,
            title: level.title(),
            progress_percent: level.progress_percent,
            xp_to_next_level: level.xp_to_next_level,
            current_streak: self.state.streak.current_streak,
            longest_streak: self.state.streak.longest_streak,
            streak_freezes: self.state.streak.streak_freezes,
            badges_unlocked: self.state.unlocked_badges.len(),
            badges_total: self.badges.catalog().len(),
            lessons_completed: self.metrics.value(MetricKey::LessonsCompleted),
            quizzes_completed: self.metrics.value(MetricKey::QuizzesCompleted),
            perfect_quizzes: self.metrics.value(MetricKey::PerfectQuizzes),
            courses_completed: self.metrics.value(MetricKey::CoursesCompleted),
            daily_logins: self.metrics.value(MetricKey::DailyLogins),
            xp_today,
            xp_by_source,
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Listen to events. Listeners see the state after the change.
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&ProgressionEvent, &ProgressionState) + Send + 'static,
    {
        self.dispatcher.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        self.dispatcher.unsubscribe(handle)
    }

    // -------------------------------------------------------------------------
    // Commit helpers
    // -------------------------------------------------------------------------

    fn grant_xp(
        &mut self,
        amount: u64,
        source: XpSource,
        lesson_id: Option<String>,
        course_id: Option<String>,
        pending: &mut Pending,
    ) {
        if amount == 0 {
            return;
        }

        let total_xp = self.state.total_xp.saturating_add(amount);
        self.state.set_total_xp(total_xp);
        self.state.xp_history.push_front(XpEvent {
            amount,
            source,
            lesson_id: lesson_id.clone(),
            course_id: course_id.clone(),
            timestamp: self.clock.timestamp(),
        });
        self.state.xp_history.truncate(self.config.history_limit);
        self.sync_derived_metrics();

        pending.xp_awarded = pending.xp_awarded.saturating_add(amount);
        pending.xp.push(ProgressionEvent::XpEarned {
            amount,
            source,
            lesson_id,
            course_id,
        });
    }

    fn commit_streak_update(&mut self, update: StreakUpdate, pending: &mut Pending) {
        if !update.changed {
            return;
        }
        if !update.continued && update.previous_streak > 0 {
            tracing::debug!(previous_streak = update.previous_streak, "streak restarted");
        }

        self.state.streak = update.state;
        self.sync_derived_metrics();
        pending.streak.push(ProgressionEvent::StreakUpdated {
            current_streak: self.state.streak.current_streak,
            is_new_record: update.is_new_record,
            streak_freezes: self.state.streak.streak_freezes,
        });

        let Some(milestone) = update.milestone else {
            return;
        };
        tracing::info!(days = milestone.days, title = milestone.title, "streak milestone");
        pending.streak.push(ProgressionEvent::MilestoneReached {
            days: milestone.days,
            title: milestone.title.to_string(),
        });
        if update.freezes_awarded > 0 {
            pending.streak.push(ProgressionEvent::FreezesAwarded {
                count: update.freezes_awarded,
                reason: format!("{}-day streak", milestone.days),
            });
        }
        if let Some(badge) = self.badges.find(milestone.badge_id) {
            self.apply_unlock(badge, pending);
        }
    }

    fn apply_unlock(&mut self, badge: &'static BadgeDefinition, pending: &mut Pending) -> bool {
        if !self.state.unlocked_badges.insert(badge.id, self.clock.timestamp()) {
            return false;
        }
        tracing::info!(badge = badge.id, rarity = %badge.rarity, "badge unlocked");
        pending.badges.push(ProgressionEvent::BadgeUnlocked {
            badge_id: badge.id.to_string(),
            badge_name: badge.name.to_string(),
            rarity: badge.rarity,
        });
        self.sync_derived_metrics();
        self.grant_xp(badge.xp_reward, XpSource::Badge, None, None, pending);
        true
    }

    /// Unlock everything that became satisfiable, following reward cascades.
    fn evaluate_badges(&mut self, scope: Scope, pending: &mut Pending) {
        let mut scope = scope;
        // Every pass unlocks at least one badge.
        for _ in 0..=self.badges.catalog().len() {
            let found = self.unlockable(scope);
            if found.is_empty() {
                return;
            }
            for badge in found {
                self.apply_unlock(badge, pending);
            }
            scope = CASCADE;
        }
    }

    fn unlockable(&self, scope: Scope) -> Vec<&'static BadgeDefinition> {
        let now = self.clock.timestamp();
        let unlocked = &self.state.unlocked_badges;
        match scope {
            Scope::All => self
                .badges
                .check_all_unlocks(&self.metrics, unlocked, now)
                .into_iter()
                .map(|result| result.badge)
                .collect(),
            Scope::Kinds(kinds) => {
                let mut found: Vec<&'static BadgeDefinition> = Vec::new();
                for kind in kinds {
                    for result in
                        self.badges
                            .check_unlocks_for_event(*kind, &self.metrics, unlocked, now)
                    {
                        if !found.iter().any(|b| b.id == result.badge.id) {
                            found.push(result.badge);
                        }
                    }
                }
                found
            }
        }
    }

    fn record_activity_metrics(&mut self, source: XpSource, params: &ActionParams) {
        let best = match source {
            XpSource::Lesson => {
                self.metrics.increment(MetricKey::LessonsCompleted, 1);
                if params.completes_course {
                    self.metrics.increment(MetricKey::CoursesCompleted, 1);
                }
                MetricKey::FastestLessonSeconds
            }
            XpSource::Quiz => {
                self.metrics.increment(MetricKey::QuizzesCompleted, 1);
                if params.score.is_some_and(|score| score >= PERFECT_SCORE) {
                    self.metrics.increment(MetricKey::PerfectQuizzes, 1);
                }
                MetricKey::FastestQuizSeconds
            }
            _ => return,
        };
        if let Some(value) = params.duration_secs {
            self.metrics.apply(&MetricUpdate::Best { key: best, value });
        }
    }

    /// Log a night or early session, at most once per local day each.
    fn record_session_time(&mut self) {
        let now = self.clock.now();
        let hour = now.hour();
        let key = if hour >= NIGHT_SESSION_START_HOUR || hour < NIGHT_SESSION_END_HOUR {
            MetricKey::NightSessions
        } else if (EARLY_SESSION_START_HOUR..EARLY_SESSION_END_HOUR).contains(&hour) {
            MetricKey::EarlySessions
        } else {
            return;
        };

        let offset = *now.offset();
        let today = now.date_naive();
        let logged_today = self
            .metrics
            .events(key)
            .last()
            .is_some_and(|at| at.with_timezone(&offset).date_naive() == today);
        if !logged_today {
            self.metrics.apply(&MetricUpdate::Record {
                key,
                at: now.to_utc(),
            });
        }
    }

    fn sync_derived_metrics(&mut self) {
        let state = &self.state;
        let derived = [
            (MetricKey::TotalXp, state.total_xp),
            (MetricKey::Level, u64::from(state.level)),
            (MetricKey::CurrentStreak, u64::from(state.streak.current_streak)),
            (MetricKey::LongestStreak, u64::from(state.streak.longest_streak)),
            (MetricKey::BadgesUnlocked, state.unlocked_badges.len() as u64),
        ];
        for (key, value) in derived {
            self.metrics.set(key, value);
        }
    }

    fn persist(&mut self) {
        if self.persistence.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(persistence) = self.persistence.as_mut() {
            if let Err(e) = persistence.save(&snapshot) {
                tracing::warn!(error = %e, "failed to persist snapshot; keeping in-memory state");
            }
        }
    }

    fn finish(&mut self, pending: Pending) -> ActionOutcome {
        self.sync_derived_metrics();
        self.persist();

        let xp_awarded = pending.xp_awarded;
        let events = pending.into_events(&self.state);
        if let Some(ProgressionEvent::LevelUp {
            new_level,
            previous_level,
            ..
        }) = events
            .iter()
            .find(|e| matches!(e, ProgressionEvent::LevelUp { .. }))
        {
            tracing::info!(previous_level, new_level, "level up");
        }
        if !events.is_empty() {
            self.dispatcher.emit(&events, &self.state);
        }
        ActionOutcome { xp_awarded, events }
    }
}

/// XP for an action, before badge rewards.
fn action_xp(source: XpSource, params: &ActionParams, streak_days: u32) -> u64 {
    let score = params.score.unwrap_or(0);
    match source {
        XpSource::Lesson => XpCalculator::lesson_xp(score, streak_days),
        XpSource::Quiz => XpCalculator::quiz_xp(score, streak_days),
        XpSource::DailyLogin => XpCalculator::daily_login_xp(streak_days),
        _ => {
            let raw = params.amount.unwrap_or(0);
            if raw < 0 {
                tracing::debug!(amount = raw, "negative grant clamped to 0");
            }
            XpCalculator::apply_streak_bonus(raw.max(0) as u64, streak_days, source)
        }
    }
}

/// Activity kinds whose badges an action of `source` can unlock.
fn activity_kinds(source: XpSource) -> &'static [ActivityKind] {
    match source {
        XpSource::Lesson => &[
            ActivityKind::Lesson,
            ActivityKind::Streak,
            ActivityKind::Session,
            ActivityKind::XpEarned,
        ],
        XpSource::Quiz => &[
            ActivityKind::Quiz,
            ActivityKind::Streak,
            ActivityKind::Session,
            ActivityKind::XpEarned,
        ],
        XpSource::Challenge => &[
            ActivityKind::Streak,
            ActivityKind::Session,
            ActivityKind::XpEarned,
        ],
        _ => &[ActivityKind::XpEarned],
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Mutex;

    static NO_BADGES: &[BadgeDefinition] = &[];

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at(2026, 5, 4, 10).expect("valid date"))
    }

    fn store(clock: &Arc<ManualClock>) -> ProgressionStore {
        ProgressionStore::new(clock.clone())
    }

    /// A store whose XP only comes from the rules under test.
    fn bare_store(clock: &Arc<ManualClock>) -> ProgressionStore {
        store(clock).with_badge_engine(BadgeEngine::with_catalog(NO_BADGES))
    }

    fn with_streak(store: &mut ProgressionStore, clock: &ManualClock, days: u32) {
        let mut snapshot = store.snapshot();
        snapshot.current_streak = days;
        snapshot.longest_streak = days;
        snapshot.last_activity_date = clock.today().pred_opt();
        store.restore(snapshot).expect("restore");
    }

    /// Snapshot store whose contents stay visible to the test.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<Option<Snapshot>>>);

    impl SnapshotStore for SharedStore {
        fn load(&self) -> Result<Option<Snapshot>, QuestlineError> {
            Ok(self.0.lock().expect("lock").clone())
        }

        fn save(&mut self, snapshot: &Snapshot) -> Result<(), QuestlineError> {
            *self.0.lock().expect("lock") = Some(snapshot.clone());
            Ok(())
        }
    }

    struct FailingStore;

    impl SnapshotStore for FailingStore {
        fn load(&self) -> Result<Option<Snapshot>, QuestlineError> {
            Err(QuestlineError::IoError("disk unplugged".to_string()))
        }

        fn save(&mut self, _: &Snapshot) -> Result<(), QuestlineError> {
            Err(QuestlineError::IoError("disk unplugged".to_string()))
        }
    }

    fn assert_level_invariant(store: &ProgressionStore) {
        let expected = LevelSystem::level_for(store.state().total_xp);
        assert_eq!(store.level_info(), expected);
    }

    #[test]
    fn perfect_lesson_from_zero() {
        let clock = clock();
        let mut store = bare_store(&clock);

        let outcome = store.record_action(XpSource::Lesson, ActionParams::with_score(100));

        assert_eq!(outcome.xp_awarded, 20);
        assert_eq!(store.state().total_xp, 20);
        assert_eq!(store.state().level, 1);
        assert_eq!(store.state().streak.current_streak, 1);
        assert!(outcome.level_up().is_none());
        assert_level_invariant(&store);
    }

    #[test]
    fn first_lesson_also_unlocks_badge() {
        let clock = clock();
        let mut store = store(&clock);

        let outcome = store.record_action(XpSource::Lesson, ActionParams::with_score(100));

        assert_eq!(outcome.unlocked_badges(), vec!["first_lesson"]);
        assert_eq!(outcome.xp_awarded, 30);
        assert_eq!(store.state().total_xp, 30);
        assert_eq!(store.metrics().value(MetricKey::BadgesUnlocked), 1);
    }

    #[test]
    fn crossing_level_boundary() {
        let clock = clock();
        let mut store = bare_store(&clock);
        let mut snapshot = store.snapshot();
        snapshot.total_xp = 90;
        store.restore(snapshot).expect("restore");

        let outcome = store.record_action(XpSource::Lesson, ActionParams::with_score(100));

        assert_eq!(store.state().total_xp, 110);
        assert_eq!(store.state().level, 2);
        assert_eq!(store.state().current_xp, 10);
        assert_eq!(
            store.state().xp_to_next_level,
            LevelSystem::xp_for_level(2) - 10
        );
        assert_eq!(outcome.level_up(), Some((1, 2)));
        assert!(outcome.events.contains(&ProgressionEvent::LevelUp {
            new_level: 2,
            previous_level: 1,
            total_xp: 110,
        }));
    }

    #[test]
    fn multi_level_jump_emits_one_event() {
        let clock = clock();
        let mut store = bare_store(&clock);

        let outcome = store.record_action(XpSource::Achievement, ActionParams::with_amount(1_000));

        let level_ups = outcome
            .events
            .iter()
            .filter(|e| matches!(e, ProgressionEvent::LevelUp { .. }))
            .count();
        assert_eq!(level_ups, 1);
        assert_eq!(outcome.level_up(), Some((1, 4)));
        assert_level_invariant(&store);
    }

    #[test]
    fn failed_quiz_awards_nothing() {
        let clock = clock();
        let mut store = bare_store(&clock);
        with_streak(&mut store, &clock, 30);

        let outcome = store.record_action(XpSource::Quiz, ActionParams::with_score(40));

        assert_eq!(outcome.xp_awarded, 0);
        assert_eq!(store.state().total_xp, 0);
        assert!(store.history().next().is_none());
        assert_eq!(store.metrics().value(MetricKey::QuizzesCompleted), 1);
        assert_eq!(store.state().streak.current_streak, 31);
    }

    #[test]
    fn streak_bonus_uses_streak_before_action() {
        let clock = clock();
        let mut store = bare_store(&clock);
        with_streak(&mut store, &clock, 7);

        let outcome = store.record_action(XpSource::Lesson, ActionParams::with_score(100));

        assert_eq!(outcome.xp_awarded, 22);
        assert_eq!(store.state().streak.current_streak, 8);
    }

    #[test]
    fn milestone_action_gets_previous_tier() {
        let clock = clock();
        let mut store = bare_store(&clock);
        with_streak(&mut store, &clock, 6);

        let outcome = store.record_action(XpSource::Lesson, ActionParams::with_score(100));

        assert_eq!(outcome.xp_awarded, 20, "streak of 6 has no bonus");
        assert_eq!(store.state().streak.current_streak, 7);
        assert_eq!(store.state().streak.streak_freezes, 1);
    }

    #[test]
    fn negative_grant_is_a_noop() {
        let clock = clock();
        let mut store = bare_store(&clock);

        let outcome = store.record_action(XpSource::Achievement, ActionParams::with_amount(-50));

        assert_eq!(outcome.xp_awarded, 0);
        assert!(outcome.events.is_empty());
        assert_eq!(store.state().total_xp, 0);
    }

    #[test]
    fn history_capped_most_recent_first() {
        let clock = clock();
        let mut store = bare_store(&clock);

        for amount in 1..=105 {
            store.record_action(XpSource::Achievement, ActionParams::with_amount(amount));
        }

        let amounts: Vec<u64> = store.history().map(|e| e.amount).collect();
        assert_eq!(amounts.len(), 100);
        assert_eq!(amounts[0], 105);
        assert_eq!(amounts[99], 6);
        assert_eq!(store.state().total_xp, (1..=105).sum::<u64>());
    }

    #[test]
    fn daily_login_is_idempotent() {
        let clock = clock();
        let mut store = store(&clock);

        let first = store.record_daily_login().expect("first login");
        assert_eq!(first.xp_awarded, 5);
        let after_first = store.state().clone();

        assert!(store.record_daily_login().is_none());
        assert_eq!(store.state(), &after_first);
        assert_eq!(store.metrics().value(MetricKey::DailyLogins), 1);
    }

    #[test]
    fn daily_login_after_lesson_is_noop() {
        let clock = clock();
        let mut store = store(&clock);
        store.record_action(XpSource::Lesson, ActionParams::default());
        assert!(store.record_daily_login().is_none());
    }

    #[test]
    fn seventh_login_reaches_milestone() {
        let clock = clock();
        let mut store = store(&clock);
        with_streak(&mut store, &clock, 6);

        let outcome = store.record_daily_login().expect("login");

        assert_eq!(store.state().streak.current_streak, 7);
        assert_eq!(store.state().streak.streak_freezes, 1);
        assert!(store.state().unlocked_badges.contains("streak_7"));
        assert!(outcome.events.contains(&ProgressionEvent::DailyLogin {
            date: clock.today(),
            consecutive_days: 7,
        }));
        assert!(outcome.events.contains(&ProgressionEvent::MilestoneReached {
            days: 7,
            title: "Week Warrior".to_string(),
        }));
        assert!(outcome.events.contains(&ProgressionEvent::FreezesAwarded {
            count: 1,
            reason: "7-day streak".to_string(),
        }));
    }

    #[test]
    fn unlock_badge_is_idempotent() {
        let clock = clock();
        let mut store = store(&clock);
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        store.subscribe(move |event, _| {
            if matches!(event, ProgressionEvent::BadgeUnlocked { .. }) {
                *sink.lock().expect("lock") += 1;
            }
        });

        assert!(store.unlock_badge("lessons_100"));
        let total = store.state().total_xp;
        assert_eq!(total, 50);

        assert!(!store.unlock_badge("lessons_100"));
        assert_eq!(store.state().total_xp, total);
        assert_eq!(store.state().unlocked_badges.len(), 1);
        assert_eq!(*seen.lock().expect("lock"), 1);
    }

    #[test]
    fn unknown_badge_is_noop() {
        let clock = clock();
        let mut store = store(&clock);
        assert!(!store.unlock_badge("no_such_badge"));
        assert!(store.state().unlocked_badges.is_empty());
    }

    #[test]
    fn freeze_award_is_capped() {
        let clock = clock();
        let mut store = store(&clock);

        assert_eq!(store.award_freezes(10, "gift"), 5);
        assert_eq!(store.state().streak.streak_freezes, 5);
        assert_eq!(store.award_freezes(1, "gift"), 0);
        assert_eq!(store.state().streak.streak_freezes, 5);
    }

    #[test]
    fn freeze_bridges_a_missed_day() {
        let clock = clock();
        let mut store = store(&clock);
        store.record_daily_login().expect("day 1");
        store.award_freezes(1, "test");

        clock.advance_days(1);
        assert!(store.use_streak_freeze());
        assert!(!store.use_streak_freeze(), "only one per day");
        assert_eq!(store.metrics().value(MetricKey::FreezesUsed), 1);

        clock.advance_days(1);
        assert_eq!(store.start_session().broken_streak, None);
        store.record_daily_login().expect("day 3");
        assert_eq!(store.state().streak.current_streak, 2);
    }

    #[test]
    fn freeze_after_two_day_gap_does_not_revive_streak() {
        let clock = clock();
        let mut store = store(&clock);
        store.award_freezes(1, "test");
        store.record_action(XpSource::Lesson, ActionParams::default());
        clock.advance_days(1);
        store.record_action(XpSource::Lesson, ActionParams::default());
        assert_eq!(store.state().streak.current_streak, 2);

        clock.advance_days(2);
        assert!(!store.use_streak_freeze());
        assert_eq!(store.state().streak.streak_freezes, 1);

        clock.advance_days(1);
        store.record_action(XpSource::Lesson, ActionParams::default());
        assert_eq!(store.state().streak.current_streak, 1);
        assert_eq!(store.state().streak.longest_streak, 2);
    }

    #[test]
    fn freeze_denied_without_streak() {
        let clock = clock();
        let mut store = store(&clock);
        store.award_freezes(2, "test");
        assert!(!store.use_streak_freeze());
        assert_eq!(store.state().streak.streak_freezes, 2);
    }

    #[test]
    fn lapsed_streak_breaks_on_session_start() {
        let clock = clock();
        let mut store = store(&clock);
        store.record_daily_login().expect("login");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |event, _| sink.lock().expect("lock").push(event.clone()));

        clock.advance_days(3);
        let start = store.start_session();

        assert_eq!(start.broken_streak, Some(1));
        assert_eq!(store.state().streak.current_streak, 0);
        assert_eq!(store.state().streak.longest_streak, 1);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![ProgressionEvent::StreakBroken {
                previous_streak: 1,
                longest_streak: 1,
            }]
        );
    }

    #[test]
    fn gap_restarts_streak_at_one() {
        let clock = clock();
        let mut store = bare_store(&clock);
        with_streak(&mut store, &clock, 4);

        clock.advance_days(2);
        store.record_action(XpSource::Lesson, ActionParams::default());

        assert_eq!(store.state().streak.current_streak, 1);
        assert_eq!(store.state().streak.longest_streak, 4);
    }

    #[test]
    fn check_streak_only_flags_risk() {
        let clock = clock();
        let mut store = store(&clock);
        store.record_daily_login().expect("login");
        clock.advance_days(1);

        assert!(!store.check_streak().is_at_risk);
        clock.set_hour(21);
        let before = store.state().total_xp;
        assert!(store.check_streak().is_at_risk);
        assert!(store.check_streak().is_at_risk);
        assert!(store.state().streak.is_at_risk);
        assert_eq!(store.state().total_xp, before);
        assert_eq!(store.state().streak.current_streak, 1);
    }

    #[test]
    fn metric_updates_trigger_full_scan() {
        let clock = clock();
        let mut store = store(&clock);

        let outcome = store.update_badge_metrics(&[
            MetricUpdate::Set {
                key: MetricKey::CoursesCompleted,
                value: 1,
            },
            MetricUpdate::Best {
                key: MetricKey::FastestLessonSeconds,
                value: 90,
            },
        ]);

        let unlocked = outcome.unlocked_badges();
        assert!(unlocked.contains(&"course_complete"));
        assert!(unlocked.contains(&"speed_lesson"));
    }

    #[test]
    fn derived_metrics_cannot_be_overwritten() {
        let clock = clock();
        let mut store = store(&clock);

        store.update_badge_metrics(&[MetricUpdate::Set {
            key: MetricKey::Level,
            value: 50,
        }]);

        assert_eq!(store.metrics().value(MetricKey::Level), 1);
        assert!(!store.state().unlocked_badges.contains("level_50"));
    }

    #[test]
    fn badge_rewards_cascade() {
        let clock = clock();
        let mut store = store(&clock);
        let mut snapshot = store.snapshot();
        // The lesson alone stops 5 XP short of level 5; the first_lesson
        // reward crosses it, which unlocks level_5 on the next pass.
        snapshot.total_xp = LevelSystem::cumulative_xp_for_level(5) - 15;
        store.restore(snapshot).expect("restore");

        let outcome = store.record_action(XpSource::Lesson, ActionParams::default());

        assert_eq!(outcome.unlocked_badges(), vec!["first_lesson", "level_5"]);
        assert_eq!(outcome.xp_awarded, 10 + 10 + 10);
        assert_eq!(outcome.level_up(), Some((4, 5)));
        assert_level_invariant(&store);
    }

    #[test]
    fn listeners_observe_committed_state() {
        let clock = clock();
        let mut store = bare_store(&clock);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = store.subscribe(move |event, state| {
            sink.lock()
                .expect("lock")
                .push((event.name(), state.total_xp));
        });

        store.record_action(XpSource::Lesson, ActionParams::with_score(100));
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![("xp:earned", 20), ("streak:updated", 20)]
        );

        assert!(store.unsubscribe(handle));
        store.record_action(XpSource::Lesson, ActionParams::with_score(100));
        assert_eq!(seen.lock().expect("lock").len(), 2);
    }

    #[test]
    fn activity_metrics_follow_actions() {
        let clock = clock();
        let mut store = store(&clock);

        store.record_action(
            XpSource::Lesson,
            ActionParams::with_score(80)
                .lesson("intro")
                .course("rust-101")
                .duration(300)
                .completing_course(),
        );
        store.record_action(XpSource::Quiz, ActionParams::with_score(100).duration(45));

        let metrics = store.metrics();
        assert_eq!(metrics.value(MetricKey::LessonsCompleted), 1);
        assert_eq!(metrics.value(MetricKey::CoursesCompleted), 1);
        assert_eq!(metrics.value(MetricKey::FastestLessonSeconds), 300);
        assert_eq!(metrics.value(MetricKey::QuizzesCompleted), 1);
        assert_eq!(metrics.value(MetricKey::PerfectQuizzes), 1);
        assert_eq!(metrics.value(MetricKey::FastestQuizSeconds), 45);

        let lesson = store
            .history()
            .find(|e| e.source == XpSource::Lesson)
            .expect("lesson event");
        assert_eq!(lesson.lesson_id.as_deref(), Some("intro"));
        assert_eq!(lesson.course_id.as_deref(), Some("rust-101"));
    }

    #[test]
    fn night_sessions_logged_once_per_day() {
        let clock = clock();
        let mut store = bare_store(&clock);
        clock.set_hour(23);

        store.record_action(XpSource::Lesson, ActionParams::default());
        store.record_action(XpSource::Lesson, ActionParams::default());
        assert_eq!(store.metrics().value(MetricKey::NightSessions), 1);

        clock.advance_days(1);
        store.record_action(XpSource::Quiz, ActionParams::with_score(60));
        assert_eq!(store.metrics().value(MetricKey::NightSessions), 2);
        assert_eq!(store.metrics().value(MetricKey::EarlySessions), 0);
    }

    #[test]
    fn state_survives_persistence_roundtrip() {
        let clock = clock();
        let shared = SharedStore::default();
        let mut first = store(&clock).with_persistence(shared.clone());
        first.start_session();
        first.record_daily_login().expect("login");
        first.record_action(XpSource::Lesson, ActionParams::with_score(95));
        first.award_freezes(2, "welcome");

        let mut second = store(&clock).with_persistence(shared);
        let start = second.start_session();

        assert!(start.restored);
        assert_eq!(second.state(), first.state());
        assert_eq!(second.metrics(), first.metrics());
    }

    #[test]
    fn persistence_failure_keeps_state() {
        let clock = clock();
        let mut store = store(&clock).with_persistence(FailingStore);

        let start = store.start_session();
        assert!(!start.restored);

        store.record_action(XpSource::Lesson, ActionParams::with_score(100));
        assert_eq!(store.state().total_xp, 30);
    }

    #[test]
    fn restore_recomputes_derived_fields() {
        let clock = clock();
        let mut store = store(&clock);
        let mut snapshot = store.snapshot();
        snapshot.total_xp = 400;
        snapshot.streak_freezes = 9;
        snapshot.current_streak = 12;
        snapshot.longest_streak = 3;

        store.restore(snapshot).expect("restore");

        assert_level_invariant(&store);
        assert_eq!(store.state().level, 3);
        assert_eq!(store.state().streak.streak_freezes, MAX_FREEZES);
        assert_eq!(store.state().streak.longest_streak, 12);
    }

    #[test]
    fn newer_snapshot_version_rejected() {
        let clock = clock();
        let mut store = store(&clock);
        let mut snapshot = store.snapshot();
        snapshot.version = FORMAT_VERSION + 1;
        snapshot.total_xp = 1_000;

        assert!(store.restore(snapshot).is_err());
        assert_eq!(store.state().total_xp, 0);
    }

    #[test]
    fn stats_summarize_today() {
        let clock = clock();
        let mut store = bare_store(&clock);
        store.record_action(XpSource::Lesson, ActionParams::with_score(100));
        clock.advance_days(1);
        store.record_action(XpSource::Quiz, ActionParams::with_score(100));

        let stats = store.stats();
        assert_eq!(stats.total_xp, 20 + 50);
        assert_eq!(stats.xp_today, 50);
        assert_eq!(stats.xp_by_source.get(&XpSource::Lesson), Some(&20));
        assert_eq!(stats.title, "Novice Learner");
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.badges_total, 0);
    }

    #[test]
    fn streak_data_reports_next_milestone() {
        let clock = clock();
        let mut store = store(&clock);
        with_streak(&mut store, &clock, 5);

        let data = store.streak_data();
        assert!(!data.active_today);
        assert_eq!(data.next_milestone.map(|m| m.days), Some(7));
        assert_eq!(data.days_until_next_milestone, Some(2));
        assert_eq!(data.bonus_percent, 0);
    }

    #[test]
    fn daily_login_through_record_action() {
        let clock = clock();
        let mut store = store(&clock);
        let outcome = store.record_action(XpSource::DailyLogin, ActionParams::default());
        assert_eq!(outcome.xp_awarded, 5);
        let again = store.record_action(XpSource::DailyLogin, ActionParams::default());
        assert_eq!(again, ActionOutcome::default());
    }
}
