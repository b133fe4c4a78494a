//! Calendar sources and event normalization.
//!
//! - [`CalendarSource`] - the trait every calendar backend implements
//! - [`RawEvent`] - a source record before normalization
//! - [`normalize_events`] - fetch payload to [`calsign_core::EventTimeline`]
//! - [`ProviderError`] - fetch errors
//!
//! ```text
//!  Google API     events file
//!      │               │
//!      ▼               ▼
//!  GoogleCalendarSource  JsonFileSource
//!      └──── CalendarSource ────┘
//!                 │  JSON payload
//!                 ▼ normalize_events()
//!           EventTimeline
//! ```

pub mod error;
pub mod file;
#[cfg(feature = "google")]
pub mod google;
pub mod normalize;
pub mod raw_event;
pub mod source;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use file::JsonFileSource;
pub use normalize::{normalize_event, normalize_events, normalize_record};
pub use raw_event::{RawEvent, RawEventTime};
pub use source::{BoxFuture, CalendarSource, ErrorSource, StaticSource};
