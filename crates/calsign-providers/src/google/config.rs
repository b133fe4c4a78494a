//! Google Calendar source configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};
use crate::source::BoxFuture;

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies a bearer token for each fetch.
///
/// Implementations may cache, refresh or re-read the token; the client
/// asks again before every `events.list` call.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>>;
}

/// How requests are authorized.
#[derive(Clone)]
pub enum Credential {
    /// A fixed OAuth 2.0 access token sent as a bearer token.
    AccessToken(String),
    /// An API key sent as the `key` query parameter (public calendars only).
    ApiKey(String),
    /// A bearer token looked up on every fetch.
    Refreshing(Arc<dyn TokenProvider>),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::Refreshing(_) => f.write_str("Refreshing(..)"),
        }
    }
}

/// Configuration for [`super::GoogleCalendarSource`].
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Calendar identifier, e.g. "primary" or an address.
    pub calendar_id: String,
    pub credential: Credential,
    pub timeout: Duration,
    /// API base URL, without a trailing slash.
    pub base_url: String,
}

impl GoogleConfig {
    pub fn new(calendar_id: impl Into<String>, credential: Credential) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            credential,
            timeout: DEFAULT_TIMEOUT,
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Checks that the calendar id and credential are non-empty.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.calendar_id.trim().is_empty() {
            return Err(ProviderError::configuration("calendar id is empty"));
        }
        match &self.credential {
            Credential::AccessToken(s) | Credential::ApiKey(s) if s.trim().is_empty() => {
                Err(ProviderError::configuration("calendar credential is empty"))
            }
            _ => Ok(()),
        }
    }

    /// The events.list endpoint for this calendar.
    pub fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }
}
