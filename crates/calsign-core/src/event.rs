//! Calendar events and the time-ordered timeline built from them.
//!
//! - [`CalendarEvent`]: an immutable title/start/end triple
//! - [`EventTimeline`]: events sorted ascending by start instant

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Title assigned to events whose upstream record has none.
pub const MISSING_TITLE: &str = "TITLE NOT FOUND";

/// A single calendar event with timezone-aware bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    title: String,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl CalendarEvent {
    /// Creates a new event.
    pub fn new(
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            title: title.into(),
            start,
            end,
        }
    }

    /// Creates an event from an optional upstream title, substituting
    /// [`MISSING_TITLE`] when absent.
    pub fn from_parts(
        title: Option<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self::new(
            title.unwrap_or_else(|| MISSING_TITLE.to_string()),
            start,
            end,
        )
    }

    /// The event title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// When the event starts.
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    /// When the event ends.
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    /// Returns true if `start <= now < end`.
    pub fn is_active_at(&self, now: &DateTime<FixedOffset>) -> bool {
        self.start <= *now && *now < self.end
    }

    /// Returns true if the event has not started yet.
    pub fn starts_after(&self, now: &DateTime<FixedOffset>) -> bool {
        *now < self.start
    }
}

/// Calendar events ordered ascending by start instant.
///
/// A timeline is rebuilt from scratch on every refresh cycle; it has no
/// mutation API beyond construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTimeline {
    events: Vec<CalendarEvent>,
}

impl EventTimeline {
    /// Builds a timeline, sorting the events by start instant.
    pub fn new(mut events: Vec<CalendarEvent>) -> Self {
        events.sort_by_key(|e| e.start);
        Self { events }
    }

    /// An empty timeline.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CalendarEvent> {
        self.events.iter()
    }

    /// Returns the earliest-starting event active at `now` together with
    /// its position in the timeline.
    pub fn active_at(&self, now: &DateTime<FixedOffset>) -> Option<(usize, &CalendarEvent)> {
        self.events
            .iter()
            .enumerate()
            .find(|(_, e)| e.is_active_at(now))
    }

    /// Returns the first event that starts after `now`.
    pub fn next_after(&self, now: &DateTime<FixedOffset>) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.starts_after(now))
    }

    /// Returns the event immediately following position `index`.
    pub fn successor(&self, index: usize) -> Option<&CalendarEvent> {
        self.events.get(index + 1)
    }
}

impl FromIterator<CalendarEvent> for EventTimeline {
    fn from_iter<I: IntoIterator<Item = CalendarEvent>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EventTimeline {
    type Item = &'a CalendarEvent;
    type IntoIter = std::slice::Iter<'a, CalendarEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
