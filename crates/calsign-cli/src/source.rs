//! Builds the configured calendar source.
//!
//! A source that cannot be built is replaced by an [`ErrorSource`], so
//! the sign shows the error text instead of the daemon refusing to start.

use calsign_providers::{CalendarSource, ErrorSource, JsonFileSource, ProviderError};
use tracing::{info, warn};

use crate::config::{CalendarSettings, SourceKind};

/// Builds the source described by `[calendar]`.
pub fn build_source(settings: &CalendarSettings) -> Box<dyn CalendarSource> {
    let name = match settings.source {
        SourceKind::Google => "google",
        SourceKind::File => "file",
    };
    match try_build_source(settings) {
        Ok(source) => {
            info!(source = source.name(), "Calendar source ready");
            source
        }
        Err(e) => {
            warn!(source = name, error = %e, "calendar source unavailable");
            Box::new(ErrorSource::new(name, e))
        }
    }
}

fn try_build_source(settings: &CalendarSettings) -> Result<Box<dyn CalendarSource>, ProviderError> {
    match settings.source {
        SourceKind::File => {
            let path = settings
                .events_file
                .as_ref()
                .ok_or_else(|| ProviderError::configuration("events_file is not set"))?;
            Ok(Box::new(JsonFileSource::new(path)))
        }
        SourceKind::Google => build_google(settings),
    }
}

#[cfg(feature = "google")]
fn build_google(settings: &CalendarSettings) -> Result<Box<dyn CalendarSource>, ProviderError> {
    use calsign_providers::google::{
        Credential, GoogleCalendarSource, GoogleConfig, OAuthApp, StoredToken,
    };
    use std::sync::Arc;
    use std::time::Duration;

    use crate::secret::{SecretRef, SecretToken};

    let calendar_id = settings
        .calendar_id
        .as_deref()
        .ok_or_else(|| ProviderError::configuration("calendar_id is not set"))?;
    let timeout = Duration::from_secs(settings.timeout_secs);

    let credential = if let Some(path) = &settings.token_file {
        let client_id = settings
            .client_id
            .as_deref()
            .ok_or_else(|| ProviderError::configuration("token_file needs client_id"))?;
        let client_secret = settings
            .client_secret
            .as_deref()
            .ok_or_else(|| ProviderError::configuration("token_file needs client_secret"))?;
        let app = OAuthApp::new(client_id, resolve_secret("client_secret", client_secret)?);
        Credential::Refreshing(Arc::new(StoredToken::load(path, app, timeout)?))
    } else if let Some(token) = &settings.access_token {
        // fail at startup on a dangling reference, then look it up per fetch
        let resolved = resolve_secret("access_token", token)?;
        match SecretRef::parse(token) {
            SecretRef::Plain(_) => Credential::AccessToken(resolved),
            _ => Credential::Refreshing(Arc::new(SecretToken::new("access_token", token.clone()))),
        }
    } else if let Some(key) = &settings.api_key {
        Credential::ApiKey(resolve_secret("api_key", key)?)
    } else {
        return Err(ProviderError::configuration(
            "none of token_file, access_token or api_key is set",
        ));
    };

    let config = GoogleConfig::new(calendar_id, credential).with_timeout(timeout);
    Ok(Box::new(GoogleCalendarSource::new(config)?))
}

#[cfg(not(feature = "google"))]
fn build_google(_settings: &CalendarSettings) -> Result<Box<dyn CalendarSource>, ProviderError> {
    Err(ProviderError::configuration(
        "calsign was built without Google Calendar support",
    ))
}

#[cfg(feature = "google")]
fn resolve_secret(field: &str, value: &str) -> Result<String, ProviderError> {
    crate::secret::resolve(value)
        .map_err(|e| ProviderError::configuration(format!("failed to resolve {}: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calsign_core::TimeWindow;
    use calsign_providers::ProviderErrorCode;

    fn window() -> TimeWindow {
        TimeWindow::lookahead(&chrono::Utc::now())
    }

    #[test]
    fn file_source_is_built() {
        let settings = CalendarSettings {
            source: SourceKind::File,
            events_file: Some("events.json".into()),
            ..Default::default()
        };
        assert_eq!(build_source(&settings).name(), "file");
    }

    #[tokio::test]
    async fn missing_file_path_falls_back_to_error_source() {
        let settings = CalendarSettings {
            source: SourceKind::File,
            ..Default::default()
        };
        let source = build_source(&settings);
        let err = source.fetch_events(window()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[cfg(feature = "google")]
    #[test]
    fn google_source_is_built() {
        let settings = CalendarSettings {
            calendar_id: Some("primary".into()),
            api_key: Some("key".into()),
            ..Default::default()
        };
        assert_eq!(build_source(&settings).name(), "google");
    }

    #[cfg(feature = "google")]
    #[test]
    fn token_file_source_is_built() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("token.json");
        std::fs::write(&token_file, r#"{"access_token": "ya29.a", "refresh_token": "1//r"}"#)
            .unwrap();

        let settings = CalendarSettings {
            calendar_id: Some("primary".into()),
            token_file: Some(token_file),
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        assert_eq!(build_source(&settings).name(), "google");
    }

    #[cfg(feature = "google")]
    #[tokio::test]
    async fn missing_token_file_falls_back_to_error_source() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CalendarSettings {
            calendar_id: Some("primary".into()),
            token_file: Some(dir.path().join("absent.json")),
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        let err = build_source(&settings)
            .fetch_events(window())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(err.message().contains("absent.json"));
    }

    #[cfg(feature = "google")]
    #[tokio::test]
    async fn unresolvable_secret_falls_back_to_error_source() {
        let settings = CalendarSettings {
            calendar_id: Some("primary".into()),
            access_token: Some("env::_CALSIGN_UNSET_TOKEN_4242".into()),
            ..Default::default()
        };
        let source = build_source(&settings);
        let err = source.fetch_events(window()).await.unwrap_err();
        assert!(err.message().contains("access_token"));
    }
}
