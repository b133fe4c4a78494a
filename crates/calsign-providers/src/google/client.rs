//! Google Calendar API client.
//!
//! Fetches the events.list pages for one calendar and merges them into a
//! single `{"items": [...]}` document. Records are left as JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::{Credential, GoogleConfig};
use crate::error::{ProviderError, ProviderResult};

/// Most events.list pages read in one fetch.
pub const MAX_PAGES: usize = 25;

/// Credentials for one fetch, resolved before the first page.
enum Auth {
    Bearer(String),
    Key(String),
}

/// One page of an events.list response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListPage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleCalendarClient {
    /// Creates a client for the configured calendar.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Lists the events overlapping `[time_min, time_max)`, recurring
    /// events expanded and ordered by start time.
    pub async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> ProviderResult<Value> {
        let auth = self.auth().await?;
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .list_events_page(&auth, time_min, time_max, page_token.as_deref())
                .await?;
            pages += 1;

            items.extend(page.items.into_iter().filter(|item| !is_cancelled(item)));

            page_token = next_page_token(pages, page_token.as_deref(), page.next_page_token)?;
            if page_token.is_none() {
                break;
            }
        }

        debug!(
            calendar = %self.config.calendar_id,
            pages,
            events = items.len(),
            "fetched calendar events"
        );
        Ok(serde_json::json!({ "items": items }))
    }

    async fn auth(&self) -> ProviderResult<Auth> {
        Ok(match &self.config.credential {
            Credential::AccessToken(token) => Auth::Bearer(token.clone()),
            Credential::ApiKey(key) => Auth::Key(key.clone()),
            Credential::Refreshing(provider) => Auth::Bearer(
                provider
                    .access_token()
                    .await
                    .map_err(|e| e.with_source_name("google"))?,
            ),
        })
    }

    async fn list_events_page(
        &self,
        auth: &Auth,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListPage> {
        let mut request = self
            .http_client
            .get(self.config.events_url())
            .query(&[
                ("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", time_max.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        request = match auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Key(key) => request.query(&[("key", key.as_str())]),
        };

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            let err = if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            };
            err.with_source_name("google")
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body, retry_after).with_source_name("google"));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e))
                .with_source_name("google")
        })?;

        parse_page(&body)
    }
}

fn parse_page(body: &str) -> ProviderResult<EventListPage> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
            .with_source_name("google")
    })
}

/// Decides whether to read another page after `pages` pages.
///
/// A server repeating the token it was just given would loop forever, so
/// that is an invalid response. Past [`MAX_PAGES`] the events read so far
/// are kept and the rest dropped.
fn next_page_token(
    pages: usize,
    current: Option<&str>,
    next: Option<String>,
) -> ProviderResult<Option<String>> {
    let Some(next) = next else {
        return Ok(None);
    };
    if current == Some(next.as_str()) {
        return Err(ProviderError::invalid_response(format!(
            "events.list returned page token {:?} twice",
            next
        ))
        .with_source_name("google"));
    }
    if pages >= MAX_PAGES {
        warn!(pages, "Stopping at page limit, later events are not shown");
        return Ok(None);
    }
    Ok(Some(next))
}

fn is_cancelled(item: &Value) -> bool {
    item.get("status").and_then(Value::as_str) == Some("cancelled")
}

/// Maps a non-success HTTP status to a [`ProviderError`].
pub fn map_status(status: u16, body: &str, retry_after: Option<u64>) -> ProviderError {
    match status {
        401 => ProviderError::authentication("access token expired or invalid"),
        403 => ProviderError::authorization("access denied to calendar"),
        404 => ProviderError::not_found("calendar not found"),
        429 => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        _ => ProviderError::server(format!("API error ({}): {}", status, body.trim())),
    }
}
