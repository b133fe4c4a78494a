//! A calendar source backed by a local JSON file.
//!
//! The file holds either a bare array of event records or an events.list
//! style document. It is re-read on every fetch so edits show up on the
//! next refresh.

use std::path::{Path, PathBuf};

use calsign_core::TimeWindow;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;
use crate::source::{BoxFuture, CalendarSource};

/// Reads events from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self, window: TimeWindow) -> ProviderResult<Value> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            let err = if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::not_found(format!("events file {} not found", self.path.display()))
            } else {
                ProviderError::io(format!("failed to read {}", self.path.display()))
            };
            err.with_source_name("file").with_cause(e)
        })?;

        let payload: Value = serde_json::from_str(&contents).map_err(|e| {
            ProviderError::invalid_response(format!(
                "{} is not valid JSON: {}",
                self.path.display(),
                e
            ))
            .with_source_name("file")
        })?;

        Ok(filter_to_window(payload, &window))
    }
}

impl CalendarSource for JsonFileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(self.read(window))
    }
}

/// Drops timed records that lie entirely outside `window`, the way the
/// remote API's `timeMin`/`timeMax` would.
///
/// Records whose bounds cannot be read are kept so that normalization
/// reports them. Payloads of other shapes pass through untouched.
pub fn filter_to_window(payload: Value, window: &TimeWindow) -> Value {
    match payload {
        Value::Array(items) => Value::Array(retain_in_window(items, window)),
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("items") {
                map.insert(
                    "items".to_string(),
                    Value::Array(retain_in_window(items, window)),
                );
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn retain_in_window(items: Vec<Value>, window: &TimeWindow) -> Vec<Value> {
    let total = items.len();
    let kept: Vec<Value> = items
        .into_iter()
        .filter(|item| {
            let bounds = serde_json::from_value::<RawEvent>(item.clone())
                .ok()
                .and_then(|raw| raw.bounds());
            match bounds {
                Some((start, end)) => end > window.start && start < window.end,
                None => true,
            }
        })
        .collect();
    debug!(total, kept = kept.len(), "filtered events file to window");
    kept
}
