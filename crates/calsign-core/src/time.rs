//! Time helpers: fetch windows and countdowns.
//!
//! [`TimeWindow`] describes the range a calendar fetch covers, and
//! [`Countdown`] breaks the time until an event into day/hour/minute parts.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Urgency;

const SECONDS_PER_DAY: i64 = 86_400;

/// Default lookahead for calendar fetches.
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;

/// A half-open `[start, end)` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a window starting at `now` and extending `duration`.
    ///
    /// The end saturates at the latest representable instant.
    pub fn from_now<Tz: TimeZone>(now: &DateTime<Tz>, duration: Duration) -> Self {
        let start = now.with_timezone(&Utc);
        let end = start
            .checked_add_signed(duration.abs())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(start, end)
    }

    /// The default lookahead window: `now` through `now + 7 days`.
    pub fn lookahead<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self::from_now(now, Duration::days(DEFAULT_LOOKAHEAD_DAYS))
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        dt >= self.start && dt < self.end
    }
}

/// Time remaining until an event starts.
///
/// The seconds-of-day component drives urgency: a countdown of one day and
/// ten minutes is as urgent as one of ten minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    days: i64,
    seconds_of_day: i64,
}

impl Countdown {
    /// Builds a countdown from a whole number of seconds. Negative input is
    /// clamped to zero.
    pub fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        Self {
            days: total / SECONDS_PER_DAY,
            seconds_of_day: total % SECONDS_PER_DAY,
        }
    }

    /// Countdown from `now` until `target`, truncated to whole seconds.
    pub fn between<Tz1: TimeZone, Tz2: TimeZone>(
        now: &DateTime<Tz1>,
        target: &DateTime<Tz2>,
    ) -> Self {
        let delta = target.with_timezone(&Utc) - now.with_timezone(&Utc);
        Self::from_seconds(delta.num_seconds())
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    pub fn hours(&self) -> i64 {
        self.seconds_of_day / 3600
    }

    pub fn minutes(&self) -> i64 {
        (self.seconds_of_day / 60) % 60
    }

    /// Seconds left once whole days are removed.
    pub fn seconds_of_day(&self) -> i64 {
        self.seconds_of_day
    }

    pub fn urgency(&self) -> Urgency {
        Urgency::from_seconds(self.seconds_of_day)
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [(self.days(), 'd'), (self.hours(), 'h'), (self.minutes(), 'm')]
            .into_iter()
            .filter(|(value, _)| *value > 0)
            .map(|(value, unit)| format!("{}{}", value, unit))
            .collect();

        if parts.is_empty() {
            write!(f, "0m")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}
