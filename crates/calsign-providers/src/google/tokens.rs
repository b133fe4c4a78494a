//! OAuth tokens kept in a JSON file and renewed when they expire.
//!
//! The file holds an access token, its expiry and a refresh token:
//!
//! ```json
//! {"access_token": "ya29...", "refresh_token": "1//0g...", "expires_at": "2025-03-04T10:00:00Z"}
//! ```
//!
//! Refreshed tokens are written back so a restart does not renew again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::TokenProvider;
use super::oauth::OAuthApp;
use crate::error::{ProviderError, ProviderResult};
use crate::source::BoxFuture;

/// Renew this many seconds before the stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token stops being usable. Never when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenInfo {
    /// An empty access token counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty() || self.expires_at.is_some_and(|at| now >= at)
    }

    /// Stores a refreshed access token valid for `expires_in_secs`.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        now: DateTime<Utc>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| lifetime.checked_sub(&TimeDelta::seconds(EXPIRY_MARGIN_SECS)))
            .and_then(|lifetime| now.checked_add_signed(lifetime));
    }
}

/// A token file plus the OAuth client that can renew it.
#[derive(Debug)]
pub struct StoredToken {
    path: PathBuf,
    app: OAuthApp,
    http: reqwest::Client,
    token: Mutex<TokenInfo>,
}

impl StoredToken {
    /// Reads the token file at `path`.
    pub fn load(path: impl Into<PathBuf>, app: OAuthApp, timeout: Duration) -> ProviderResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read token file {}: {}",
                path.display(),
                e
            ))
            .with_cause(e)
        })?;
        let token: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                path.display(),
                e
            ))
        })?;
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            ProviderError::configuration(format!("failed to create HTTP client: {}", e))
        })?;

        debug!(path = %path.display(), ?token, "Loaded token file");
        Ok(Self {
            path,
            app,
            http,
            token: Mutex::new(token),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current access token, refreshed first if it has expired.
    pub async fn current(&self) -> ProviderResult<String> {
        let mut token = self.token.lock().await;
        let now = Utc::now();
        if !token.is_expired_at(now) {
            return Ok(token.access_token.clone());
        }

        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            ProviderError::authentication("access token expired and no refresh token is stored")
        })?;
        debug!(path = %self.path.display(), "Access token expired, refreshing");

        let response = self.app.refresh(&self.http, &refresh_token).await?;
        token.update_access_token(response.access_token, response.expires_in, now);
        if let Some(rotated) = response.refresh_token {
            token.refresh_token = Some(rotated);
        }

        // the new token is still good for this process
        match save(&self.path, &token).await {
            Ok(()) => info!(path = %self.path.display(), "Saved refreshed token"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Could not save refreshed token"),
        }
        Ok(token.access_token.clone())
    }
}

impl TokenProvider for StoredToken {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(self.current())
    }
}

/// Writes through a temporary file so a crash never leaves half a token.
async fn save(path: &Path, token: &TokenInfo) -> std::io::Result<()> {
    let content = serde_json::to_string_pretty(token)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }
    tokio::fs::rename(&tmp, path).await
}
