//! Core types: events, timelines, sign colors, display state rendering

pub mod color;
pub mod event;
pub mod render;
pub mod time;
pub mod tracing;

pub use color::{BRAND_ORANGE, COLOR_ESCAPE, SignColor, Urgency};
pub use event::{CalendarEvent, EventTimeline, MISSING_TITLE};
pub use render::{
    DisplayState, MessageRenderer, NO_DATA_TEXT, NextPreview, NoDataReason, RenderOptions,
    RenderedMessage, render,
};
pub use time::{Countdown, TimeWindow};
pub use self::tracing::{LogSink, TracingConfig, TracingError, TracingOutputFormat, init_tracing};
