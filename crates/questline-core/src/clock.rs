//! # Clock
//!
//! The only way time enters the engine. Streak rules work on the learner's
//! local calendar day, so the clock reports a wall time with its UTC offset.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Timelike, Utc};
use std::sync::Mutex;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current wall time in the learner's timezone.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current local calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Current local hour (0-23).
    fn hour(&self) -> u32 {
        self.now().hour()
    }

    /// Current instant in UTC, for timestamps.
    fn timestamp(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// Reads the operating system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and by hosts replaying recorded activity.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// A clock at `hour:00` UTC on the given date.
    ///
    /// Returns `None` for an invalid date or hour.
    #[must_use]
    pub fn at(year: i32, month: u32, day: u32, hour: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let naive = date.and_hms_opt(hour, 0, 0)?;
        Some(Self::new(naive.and_utc().fixed_offset()))
    }

    /// Replace the current time.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    /// Move forward by whole days, keeping the time of day.
    pub fn advance_days(&self, days: i64) {
        let next = self.now() + chrono::Duration::days(days);
        self.set(next);
    }

    /// Move to the given hour of the current day.
    pub fn set_hour(&self, hour: u32) {
        if let Some(next) = self.now().with_hour(hour) {
            self.set(next);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
