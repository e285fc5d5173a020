//! # Progression Events
//!
//! Domain events emitted by the store after a mutation is committed, and the
//! dispatcher that fans them out to host listeners.
//!
//! Listeners are called synchronously, in subscription order, with the event
//! and the already-committed state.

use crate::badge::Rarity;
use crate::store::ProgressionState;
use crate::types::XpSource;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Something observable that changed in the learner's progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressionEvent {
    XpEarned {
        amount: u64,
        source: XpSource,
        lesson_id: Option<String>,
        course_id: Option<String>,
    },
    /// One event per action, even when several levels were crossed.
    LevelUp {
        new_level: u32,
        previous_level: u32,
        total_xp: u64,
    },
    BadgeUnlocked {
        badge_id: String,
        badge_name: String,
        rarity: Rarity,
    },
    StreakUpdated {
        current_streak: u32,
        is_new_record: bool,
        streak_freezes: u32,
    },
    StreakBroken {
        previous_streak: u32,
        longest_streak: u32,
    },
    DailyLogin {
        date: NaiveDate,
        consecutive_days: u32,
    },
    FreezeUsed {
        remaining: u32,
    },
    FreezesAwarded {
        count: u32,
        reason: String,
    },
    MilestoneReached {
        days: u32,
        title: String,
    },
}

impl ProgressionEvent {
    /// Wire name of the event, e.g. `"xp:earned"`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ProgressionEvent::XpEarned { .. } => "xp:earned",
            ProgressionEvent::LevelUp { .. } => "level:up",
            ProgressionEvent::BadgeUnlocked { .. } => "badge:unlocked",
            ProgressionEvent::StreakUpdated { .. } => "streak:updated",
            ProgressionEvent::StreakBroken { .. } => "streak:broken",
            ProgressionEvent::DailyLogin { .. } => "daily:login",
            ProgressionEvent::FreezeUsed { .. } => "freeze:used",
            ProgressionEvent::FreezesAwarded { .. } => "freezes:awarded",
            ProgressionEvent::MilestoneReached { .. } => "milestone:reached",
        }
    }
}

/// Handle returned by `subscribe`; pass it to `unsubscribe` to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&ProgressionEvent, &ProgressionState) + Send>;

/// Ordered set of listeners.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: BTreeMap<Subscription, Listener>,
    next_id: u64,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners fire in subscription order.
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&ProgressionEvent, &ProgressionState) + Send + 'static,
    {
        let handle = Subscription(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.listeners.insert(handle, Box::new(listener));
        handle
    }

    /// Remove a listener. Returns `false` if the handle was not registered.
    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        self.listeners.remove(&handle).is_some()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver events in order to every listener.
    pub fn emit(&mut self, events: &[ProgressionEvent], state: &ProgressionState) {
        for event in events {
            tracing::debug!(event = event.name(), "emit");
            for listener in self.listeners.values_mut() {
                listener(event, state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<String>>>;

    fn recorder() -> (
        Seen,
        impl FnMut(&ProgressionEvent, &ProgressionState) + Send + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |event: &ProgressionEvent, _: &ProgressionState| {
            sink.lock().expect("lock").push(event.name().to_string());
        };
        (seen, listener)
    }

    #[test]
    fn events_delivered_in_order() {
        let mut dispatcher = EventDispatcher::new();
        let (seen, listener) = recorder();
        dispatcher.subscribe(listener);

        let events = [
            ProgressionEvent::XpEarned {
                amount: 10,
                source: XpSource::Lesson,
                lesson_id: None,
                course_id: None,
            },
            ProgressionEvent::FreezeUsed { remaining: 1 },
        ];
        dispatcher.emit(&events, &ProgressionState::default());

        assert_eq!(*seen.lock().expect("lock"), vec!["xp:earned", "freeze:used"]);
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let mut dispatcher = EventDispatcher::new();
        let (seen, listener) = recorder();
        let handle = dispatcher.subscribe(listener);

        assert!(dispatcher.unsubscribe(handle));
        assert!(!dispatcher.unsubscribe(handle));
        dispatcher.emit(
            &[ProgressionEvent::FreezeUsed { remaining: 0 }],
            &ProgressionState::default(),
        );

        assert!(seen.lock().expect("lock").is_empty());
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = ProgressionEvent::LevelUp {
            new_level: 3,
            previous_level: 1,
            total_xp: 400,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "level_up");
        assert_eq!(json["new_level"], 3);
    }
}
