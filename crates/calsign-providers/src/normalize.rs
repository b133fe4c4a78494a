//! Raw fetch payload to [`EventTimeline`] conversion.
//!
//! The payload is either a Google-style `{"items": [...]}` document or a
//! bare array of event records. Anything else yields an empty timeline,
//! which the display treats as "no data".
//!
//! Records without parseable timed start/end values (including all-day
//! events) are skipped with a warning; every other record is kept, titles
//! default to [`calsign_core::MISSING_TITLE`], and nothing is filtered by
//! date.

use calsign_core::{CalendarEvent, EventTimeline};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::raw_event::RawEvent;

/// Converts a raw fetch payload into a sorted timeline.
pub fn normalize_events(payload: &Value) -> EventTimeline {
    let items = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(items)) => items.as_slice(),
            None | Some(Value::Null) => &[],
            Some(other) => {
                warn!(kind = value_kind(other), "event payload `items` is not a list");
                return EventTimeline::empty();
            }
        },
        other => {
            warn!(kind = value_kind(other), "event payload is not a list of records");
            return EventTimeline::empty();
        }
    };

    let timeline: EventTimeline = items.iter().filter_map(normalize_record).collect();
    debug!(
        records = items.len(),
        events = timeline.len(),
        "normalized calendar events"
    );
    timeline
}

/// Converts one JSON record, returning `None` if it is unusable.
pub fn normalize_record(record: &Value) -> Option<CalendarEvent> {
    match RawEvent::deserialize(record) {
        Ok(raw) => normalize_event(&raw),
        Err(e) => {
            warn!(error = %e, "skipping malformed event record");
            None
        }
    }
}

/// Converts a [`RawEvent`], returning `None` if it lacks timed bounds.
pub fn normalize_event(raw: &RawEvent) -> Option<CalendarEvent> {
    match raw.bounds() {
        Some((start, end)) => Some(CalendarEvent::from_parts(raw.summary.clone(), start, end)),
        None => {
            warn!(
                id = raw.id.as_deref().unwrap_or("-"),
                summary = raw.summary.as_deref().unwrap_or("-"),
                "skipping event without timed start/end"
            );
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
