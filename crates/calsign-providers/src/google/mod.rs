//! Google Calendar source.
//!
//! Reads a single calendar through the v3 events.list endpoint, using an
//! OAuth access token, an API key, or a [`TokenProvider`] asked for a fresh
//! bearer token on every fetch. [`StoredToken`] is the provider for a token
//! file with a refresh token; the initial consent flow happens elsewhere.
//!
//! # Example
//!
//! ```ignore
//! use calsign_providers::google::{Credential, GoogleCalendarSource, GoogleConfig};
//!
//! let config = GoogleConfig::new("primary", Credential::AccessToken(token));
//! let source = GoogleCalendarSource::new(config)?;
//! let payload = source.fetch_events(TimeWindow::lookahead(&Utc::now())).await?;
//! ```

mod client;
mod config;
mod oauth;
mod tokens;

pub use client::{GoogleCalendarClient, MAX_PAGES, map_status};
pub use config::{CALENDAR_API_BASE, Credential, DEFAULT_TIMEOUT, GoogleConfig, TokenProvider};
pub use oauth::{GOOGLE_TOKEN_URL, OAuthApp};
pub use tokens::{StoredToken, TokenInfo};

use calsign_core::TimeWindow;
use serde_json::Value;

use crate::error::ProviderResult;
use crate::source::{BoxFuture, CalendarSource};

/// A [`CalendarSource`] for one Google calendar.
#[derive(Debug)]
pub struct GoogleCalendarSource {
    client: GoogleCalendarClient,
}

impl GoogleCalendarSource {
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: GoogleCalendarClient::new(config)?,
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.client.config().calendar_id
    }
}

impl CalendarSource for GoogleCalendarSource {
    fn name(&self) -> &str {
        "google"
    }

    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(self.client.list_events(window.start, window.end))
    }
}
