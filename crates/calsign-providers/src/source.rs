//! The [`CalendarSource`] trait and the trivial sources.
//!
//! A source returns the raw fetch payload for a time window. The payload
//! is left as JSON so that [`crate::normalize_events`] alone decides what
//! counts as a usable event, whatever the source.

use std::future::Future;
use std::pin::Pin;

use calsign_core::TimeWindow;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};

/// A boxed future for async trait methods.
///
/// Keeps [`CalendarSource`] usable as a trait object.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar backend.
///
/// # Example
///
/// ```ignore
/// impl CalendarSource for MySource {
///     fn name(&self) -> &str { "mine" }
///
///     fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>> {
///         Box::pin(async move { Ok(serde_json::json!({"items": []})) })
///     }
/// }
/// ```
pub trait CalendarSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches the events overlapping `window`.
    ///
    /// Returns either a bare array of event records or a document with an
    /// `items` array.
    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>>;
}

/// A source that always returns the same payload.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    payload: Value,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

impl CalendarSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_events(&self, _window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>> {
        let payload = self.payload.clone();
        Box::pin(async move { Ok(payload) })
    }
}

/// A source that always fails.
///
/// Stands in for a source that could not be constructed, so the sign
/// still shows the error display instead of the daemon refusing to run.
#[derive(Debug)]
pub struct ErrorSource {
    name: String,
    error: ProviderError,
}

impl ErrorSource {
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

impl CalendarSource for ErrorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_events(&self, _window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>> {
        let error =
            ProviderError::new(self.error.code(), self.error.message()).with_source_name(&self.name);
        Box::pin(async move { Err(error) })
    }
}
