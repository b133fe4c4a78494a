//! Display state machine.
//!
//! Collapses a timeline and the current instant into a single
//! [`DisplayState`] plus the line of text the sign should show.
//!
//! Rules, in priority order:
//! 1. The earliest-starting event active at `now` is shown as in progress,
//!    with a "next meeting" preview when its successor starts shortly after.
//! 2. Otherwise the first event that has not started yet is shown with a
//!    countdown.
//! 3. Otherwise the fixed no-data text is shown.
//!
//! # Example
//!
//! ```rust
//! use calsign_core::{CalendarEvent, EventTimeline, MessageRenderer};
//! use chrono::{FixedOffset, TimeZone};
//!
//! let tz = FixedOffset::east_opt(0).unwrap();
//! let now = tz.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
//! let timeline = EventTimeline::new(vec![CalendarEvent::new(
//!     "Review",
//!     tz.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap(),
//!     tz.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap(),
//! )]);
//!
//! let message = MessageRenderer::with_defaults().render_at(&now, &timeline);
//! assert!(message.text.ends_with("Review in 30m"));
//! ```


use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::color::{BRAND_ORANGE, SignColor, Urgency};
use crate::event::{CalendarEvent, EventTimeline};
use crate::time::Countdown;

/// Text shown when nothing can be displayed.
pub const NO_DATA_TEXT: &str = "Error: could not retrieve calendar data";

/// Label in front of the next-meeting preview.
pub const NEXT_MEETING_LABEL: &str = "NEXT MEETING: ";

const PREVIEW_SEPARATOR: &str = "              ";

/// Why nothing but the fallback text is displayed.
///
/// All reasons render identically; they are kept apart so callers can log
/// or report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    /// The calendar fetch failed.
    FetchFailed,
    /// The fetch returned no events.
    EmptyTimeline,
    /// Every event has already ended.
    Exhausted,
}

impl NoDataReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchFailed => "fetch_failed",
            Self::EmptyTimeline => "empty_timeline",
            Self::Exhausted => "exhausted",
        }
    }
}

/// Preview of the meeting that follows the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPreview {
    pub event: CalendarEvent,
    /// Seconds between the current and next event's start times.
    pub gap_secs: i64,
    pub urgency: Urgency,
}

/// What the sign is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    /// No event is active or upcoming.
    NoData(NoDataReason),
    /// An event is in progress.
    InProgress {
        current: CalendarEvent,
        next: Option<NextPreview>,
    },
    /// The next event has not started yet.
    Upcoming {
        target: CalendarEvent,
        countdown: Countdown,
    },
    /// Calendar data could not be obtained.
    Error { message: String },
}

impl DisplayState {
    /// Short machine-friendly name of the state.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoData(_) => "no_data",
            Self::InProgress { .. } => "in_progress",
            Self::Upcoming { .. } => "upcoming",
            Self::Error { .. } => "error",
        }
    }

    /// The reason the fallback text is shown, if it is.
    pub fn no_data_reason(&self) -> Option<NoDataReason> {
        match self {
            Self::NoData(reason) => Some(*reason),
            Self::Error { .. } => Some(NoDataReason::FetchFailed),
            _ => None,
        }
    }
}

/// A display state and its rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub state: DisplayState,
    pub text: String,
}

/// Rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Color prefix for in-progress text. `None` disables the prefix.
    pub accent_color: Option<SignColor>,
    /// A successor starting less than this many seconds after the current
    /// event's start is previewed.
    pub next_meeting_window_secs: i64,
    /// Text shown (after a high-urgency color) when there is nothing to show.
    pub no_data_text: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            accent_color: Some(BRAND_ORANGE),
            next_meeting_window_secs: 8 * 60,
            no_data_text: NO_DATA_TEXT.to_string(),
        }
    }
}

/// Renders display states from timelines.
#[derive(Debug, Clone, Default)]
pub struct MessageRenderer {
    options: RenderOptions,
}

impl MessageRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Renders the display for `now`. Times are shown in `now`'s timezone.
    pub fn render_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        timeline: &EventTimeline,
    ) -> RenderedMessage {
        let now = now.fixed_offset();

        if let Some((index, current)) = timeline.active_at(&now) {
            return self.render_in_progress(&now, current, timeline.successor(index));
        }

        if let Some(target) = timeline.next_after(&now) {
            return self.render_upcoming(&now, target);
        }

        let reason = if timeline.is_empty() {
            NoDataReason::EmptyTimeline
        } else {
            NoDataReason::Exhausted
        };
        RenderedMessage {
            state: DisplayState::NoData(reason),
            text: self.no_data_text(),
        }
    }

    /// Renders the fallback for a failed fetch.
    pub fn render_failure(&self, message: impl Into<String>) -> RenderedMessage {
        RenderedMessage {
            state: DisplayState::Error {
                message: message.into(),
            },
            text: self.no_data_text(),
        }
    }

    fn render_in_progress(
        &self,
        now: &DateTime<FixedOffset>,
        current: &CalendarEvent,
        successor: Option<&CalendarEvent>,
    ) -> RenderedMessage {
        let mut text = String::new();
        if let Some(accent) = self.options.accent_color {
            text.push_str(&accent.control_code());
        }
        text.push_str(&event_span(current, now.offset()));

        let window = Duration::seconds(self.options.next_meeting_window_secs);
        let next = successor
            .filter(|next| next.start() - current.start() < window)
            .map(|next| {
                let gap_secs = (next.start() - current.start()).num_seconds();
                NextPreview {
                    event: next.clone(),
                    gap_secs,
                    urgency: Urgency::from_seconds(gap_secs),
                }
            });

        if let Some(ref preview) = next {
            text.push_str(PREVIEW_SEPARATOR);
            text.push_str(&preview.urgency.color().control_code());
            text.push_str(NEXT_MEETING_LABEL);
            text.push_str(&event_span(&preview.event, now.offset()));
        }

        RenderedMessage {
            state: DisplayState::InProgress {
                current: current.clone(),
                next,
            },
            text,
        }
    }

    fn render_upcoming(&self, now: &DateTime<FixedOffset>, target: &CalendarEvent) -> RenderedMessage {
        let countdown = Countdown::between(now, &target.start());
        let text = format!(
            "{}{} in {}",
            countdown.urgency().color().control_code(),
            target.title(),
            countdown
        );

        RenderedMessage {
            state: DisplayState::Upcoming {
                target: target.clone(),
                countdown,
            },
            text,
        }
    }

    fn no_data_text(&self) -> String {
        format!(
            "{}{}",
            Urgency::High.color().control_code(),
            self.options.no_data_text
        )
    }
}

/// Renders `"<title> / <h>:<mm>-<h>:<mm>"` on a 12-hour clock without an
/// AM/PM marker.
pub fn event_span(event: &CalendarEvent, tz: &FixedOffset) -> String {
    let start = event.start().with_timezone(tz);
    let end = event.end().with_timezone(tz);
    // noon and midnight read as 12; a bare `hour % 12` would print 0
    format!(
        "{} / {}:{:02}-{}:{:02}",
        event.title(),
        start.hour12().1,
        start.minute(),
        end.hour12().1,
        end.minute()
    )
}

/// Renders with default options, returning the state and its text.
pub fn render<Tz: TimeZone>(now: &DateTime<Tz>, timeline: &EventTimeline) -> (DisplayState, String) {
    let message = MessageRenderer::with_defaults().render_at(now, timeline);
    (message.state, message.text)
}
