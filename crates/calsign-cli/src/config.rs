//! Daemon configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/calsign/config.toml`:
//!
//! ```toml
//! [calendar]
//! source = "google"
//! calendar_id = "team@example.com"
//! access_token = "env::CALSIGN_TOKEN"
//!
//! [display]
//! accent_color = "E4701E"
//! timezone = "America/New_York"
//!
//! [device]
//! port = "/dev/ttyUSB0"
//! ```
//!
//! Credential values (`access_token`, `api_key`, `client_secret`) accept
//! `env::` and `pass::` secret references. An `access_token` reference is
//! resolved again on every fetch. For unattended use, `token_file` holds
//! an OAuth token with a refresh token and is renewed as it expires.

use std::path::{Path, PathBuf};
use std::time::Duration;

use calsign_core::{BRAND_ORANGE, NO_DATA_TEXT, RenderOptions, SignColor};
use calsign_server::{MAX_MESSAGE_LENGTH, SchedulerConfig, SerialSignConfig, SystemClock};
use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Longest accepted `lookahead_days`.
pub const MAX_LOOKAHEAD_DAYS: i64 = 366;

/// Longest accepted `next_meeting_window_secs`.
pub const MAX_NEXT_MEETING_WINDOW_SECS: i64 = 86_400;

/// Shortest accepted `poll_interval_ms`.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignConfig {
    pub calendar: CalendarSettings,
    pub display: DisplaySettings,
    pub device: DeviceSettings,
    pub daemon: DaemonSettings,
}

/// Where events come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Google,
    File,
}

/// `[calendar]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub source: SourceKind,
    /// Google calendar id.
    pub calendar_id: Option<String>,
    /// OAuth access token (supports `env::` and `pass::`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// API key for public calendars (supports `env::` and `pass::`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// OAuth token file with a refresh token. Takes precedence over
    /// `access_token` and `api_key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    /// OAuth client used to refresh `token_file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// JSON events file for `source = "file"`.
    pub events_file: Option<PathBuf>,
    pub lookahead_days: i64,
    pub timeout_secs: u64,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            source: SourceKind::Google,
            calendar_id: None,
            access_token: None,
            api_key: None,
            token_file: None,
            client_id: None,
            client_secret: None,
            events_file: None,
            lookahead_days: calsign_core::time::DEFAULT_LOOKAHEAD_DAYS,
            timeout_secs: 10,
        }
    }
}

/// `[display]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Color prefix for in-progress events.
    pub accent_color: Option<SignColor>,
    /// IANA zone for event times. The system zone when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<Tz>,
    pub no_data_text: String,
    pub max_message_length: usize,
    pub next_meeting_window_secs: i64,
    pub update_interval_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            accent_color: Some(BRAND_ORANGE),
            timezone: None,
            no_data_text: NO_DATA_TEXT.to_string(),
            max_message_length: MAX_MESSAGE_LENGTH,
            next_meeting_window_secs: 480,
            update_interval_secs: 60,
            poll_interval_ms: 1000,
        }
    }
}

/// `[device]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Serial port the sign is attached to.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub welcome_text: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: calsign_server::device::DEFAULT_BAUD_RATE,
            welcome_text: "calsign".to_string(),
        }
    }
}

/// `[daemon]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub pid_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl SignConfig {
    /// Loads the default config file, or defaults if it does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calsign")
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            accent_color: self.display.accent_color,
            next_meeting_window_secs: self.display.next_meeting_window_secs,
            no_data_text: self.display.no_data_text.clone(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::default()
            .with_update_interval(Duration::from_secs(self.display.update_interval_secs))
            .with_poll_interval(Duration::from_millis(self.display.poll_interval_ms))
            .with_lookahead(
                TimeDelta::try_days(self.calendar.lookahead_days).unwrap_or_else(TimeDelta::max_value),
            )
    }

    /// The clock event times are rendered against.
    pub fn clock(&self) -> SystemClock {
        match self.display.timezone {
            Some(zone) => SystemClock::in_zone(zone),
            None => SystemClock::local(),
        }
    }

    /// Serial settings, if a port is configured.
    pub fn serial_config(&self) -> Option<SerialSignConfig> {
        let port = self.device.port.as_deref()?;
        Some(
            SerialSignConfig::new(port)
                .with_baud_rate(self.device.baud_rate)
                .with_welcome_text(self.device.welcome_text.clone()),
        )
    }

    /// Checks settings that do not require I/O.
    pub fn validate(&self) -> Result<(), String> {
        match self.calendar.source {
            SourceKind::Google => {
                if self.calendar.calendar_id.as_deref().is_none_or(str::is_empty) {
                    return Err("[calendar] calendar_id is required for the google source".into());
                }
                if self.calendar.token_file.is_none()
                    && self.calendar.access_token.is_none()
                    && self.calendar.api_key.is_none()
                {
                    return Err(
                        "[calendar] needs token_file, access_token or api_key for the google source"
                            .into(),
                    );
                }
                if self.calendar.token_file.is_some()
                    && (self.calendar.client_id.is_none() || self.calendar.client_secret.is_none())
                {
                    return Err(
                        "[calendar] token_file needs client_id and client_secret".into(),
                    );
                }
            }
            SourceKind::File => {
                if self.calendar.events_file.is_none() {
                    return Err("[calendar] events_file is required for the file source".into());
                }
            }
        }
        self.validate_limits()
    }

    /// Checks the numeric settings the refresh loop depends on.
    ///
    /// Unlike [`SignConfig::validate`] this ignores the calendar source,
    /// which falls back to an error message on the sign instead.
    pub fn validate_limits(&self) -> Result<(), String> {
        if !(1..=MAX_LOOKAHEAD_DAYS).contains(&self.calendar.lookahead_days) {
            return Err(format!(
                "[calendar] lookahead_days must be between 1 and {}",
                MAX_LOOKAHEAD_DAYS
            ));
        }
        if self.calendar.timeout_secs == 0 {
            return Err("[calendar] timeout_secs must be positive".into());
        }
        if !(1..=MAX_MESSAGE_LENGTH).contains(&self.display.max_message_length) {
            return Err(format!(
                "[display] max_message_length must be between 1 and {}",
                MAX_MESSAGE_LENGTH
            ));
        }
        if self.display.update_interval_secs == 0 {
            return Err("[display] update_interval_secs must be positive".into());
        }
        if self.display.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(format!(
                "[display] poll_interval_ms must be at least {}",
                MIN_POLL_INTERVAL_MS
            ));
        }
        if !(0..=MAX_NEXT_MEETING_WINDOW_SECS).contains(&self.display.next_meeting_window_secs) {
            return Err(format!(
                "[display] next_meeting_window_secs must be between 0 and {}",
                MAX_NEXT_MEETING_WINDOW_SECS
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SignConfig::default();
        assert_eq!(config.calendar.source, SourceKind::Google);
        assert_eq!(config.calendar.lookahead_days, 7);
        assert_eq!(config.display.accent_color, Some(BRAND_ORANGE));
        assert_eq!(config.display.max_message_length, 126);
        assert_eq!(config.device.baud_rate, 9600);

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.update_interval, Duration::from_secs(60));
        assert_eq!(scheduler.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn empty_file_is_default() {
        let config = SignConfig::parse("").unwrap();
        assert_eq!(config.display.update_interval_secs, 60);
        assert!(config.device.port.is_none());
    }

    #[test]
    fn full_config() {
        let config = SignConfig::parse(
            r#"
            [calendar]
            source = "google"
            calendar_id = "team@example.com"
            api_key = "env::CALSIGN_KEY"
            lookahead_days = 3

            [display]
            accent_color = "orange"
            next_meeting_window_secs = 600

            [device]
            port = "/dev/ttyUSB0"
            baud_rate = 19200

            [daemon]
            pid_file = "/run/calsign.pid"
            "#,
        )
        .unwrap();

        assert_eq!(config.calendar.api_key.as_deref(), Some("env::CALSIGN_KEY"));
        assert_eq!(config.display.accent_color, Some(SignColor::Orange));
        assert_eq!(config.render_options().next_meeting_window_secs, 600);
        assert_eq!(
            config.scheduler_config().lookahead,
            chrono::Duration::days(3)
        );
        let serial = config.serial_config().unwrap();
        assert_eq!(serial.port, "/dev/ttyUSB0");
        assert_eq!(serial.baud_rate, 19200);
        assert_eq!(config.daemon.pid_file, Some(PathBuf::from("/run/calsign.pid")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_source() {
        let config = SignConfig::parse(
            r#"
            [calendar]
            source = "file"
            events_file = "events.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.calendar.source, SourceKind::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert!(SignConfig::parse("[calendar]\nsource = \"ical\"\n").is_err());
    }

    #[test]
    fn bad_color_is_rejected() {
        assert!("plaid".parse::<SignColor>().is_err());
        assert!(SignConfig::parse("[display]\naccent_color = \"plaid\"\n").is_err());
    }

    mod validation {
        use super::*;

        #[test]
        fn google_needs_calendar_id() {
            let config = SignConfig::default();
            assert!(config.validate().unwrap_err().contains("calendar_id"));
        }

        #[test]
        fn google_needs_credential() {
            let mut config = SignConfig::default();
            config.calendar.calendar_id = Some("primary".into());
            assert!(config.validate().unwrap_err().contains("access_token"));
        }

        #[test]
        fn file_needs_path() {
            let mut config = SignConfig::default();
            config.calendar.source = SourceKind::File;
            assert!(config.validate().unwrap_err().contains("events_file"));
        }

        fn file_config() -> SignConfig {
            let mut config = SignConfig::default();
            config.calendar.source = SourceKind::File;
            config.calendar.events_file = Some("e.json".into());
            config
        }

        #[test]
        fn intervals_must_be_positive() {
            let mut config = file_config();
            config.display.update_interval_secs = 0;
            assert!(config.validate().is_err());
        }

        #[test]
        fn huge_lookahead_is_rejected() {
            let config = SignConfig::parse(
                "[calendar]\nsource = \"file\"\nevents_file = \"e.json\"\nlookahead_days = 200000000\n",
            )
            .unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.contains("lookahead_days"), "{err}");
            assert!(config.validate_limits().is_err());
        }

        #[test]
        fn lookahead_bounds() {
            let mut config = file_config();
            config.calendar.lookahead_days = 0;
            assert!(config.validate().is_err());
            config.calendar.lookahead_days = MAX_LOOKAHEAD_DAYS;
            assert!(config.validate().is_ok());
            config.calendar.lookahead_days = MAX_LOOKAHEAD_DAYS + 1;
            assert!(config.validate().is_err());
        }

        #[test]
        fn busy_poll_is_rejected() {
            let mut config = file_config();
            config.display.poll_interval_ms = 0;
            assert!(config.validate().unwrap_err().contains("poll_interval_ms"));
            config.display.poll_interval_ms = MIN_POLL_INTERVAL_MS;
            assert!(config.validate().is_ok());
        }

        #[test]
        fn next_meeting_window_bounds() {
            let mut config = file_config();
            config.display.next_meeting_window_secs = -1;
            assert!(config.validate().is_err());
            config.display.next_meeting_window_secs = MAX_NEXT_MEETING_WINDOW_SECS + 1;
            assert!(config.validate().is_err());
        }

        #[test]
        fn message_length_is_capped_by_the_sign() {
            let mut config = file_config();
            config.display.max_message_length = MAX_MESSAGE_LENGTH + 1;
            assert!(config.validate().unwrap_err().contains("max_message_length"));
        }

        #[test]
        fn limits_ignore_the_source() {
            let config = SignConfig::default();
            assert!(config.validate().is_err());
            assert!(config.validate_limits().is_ok());
        }

        #[test]
        fn token_file_needs_client() {
            let mut config = SignConfig::default();
            config.calendar.calendar_id = Some("primary".into());
            config.calendar.token_file = Some("token.json".into());
            assert!(config.validate().unwrap_err().contains("client_id"));

            config.calendar.client_id = Some("id".into());
            config.calendar.client_secret = Some("env::CALSIGN_CLIENT_SECRET".into());
            assert!(config.validate().is_ok());
        }
    }

    mod timezone {
        use super::*;

        #[test]
        fn unset_uses_the_system_zone() {
            assert_eq!(SignConfig::default().clock().zone(), None);
        }

        #[test]
        fn named_zone_is_parsed() {
            let config = SignConfig::parse("[display]\ntimezone = \"US/Eastern\"\n").unwrap();
            assert_eq!(config.display.timezone, Some(chrono_tz::US::Eastern));
            assert_eq!(config.clock().zone(), Some(chrono_tz::US::Eastern));
        }

        #[test]
        fn unknown_zone_is_rejected() {
            assert!(SignConfig::parse("[display]\ntimezone = \"Mars/Olympus\"\n").is_err());
        }

        #[test]
        fn zone_survives_a_dump() {
            let mut config = SignConfig::default();
            config.display.timezone = Some(chrono_tz::Asia::Kolkata);
            let text = toml::to_string_pretty(&config).unwrap();
            assert!(text.contains("timezone = \"Asia/Kolkata\""));
            let parsed = SignConfig::parse(&text).unwrap();
            assert_eq!(parsed.display.timezone, Some(chrono_tz::Asia::Kolkata));
        }
    }

    #[test]
    fn dump_round_trips() {
        let mut config = SignConfig::default();
        config.device.port = Some("/dev/ttyACM0".into());
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = SignConfig::parse(&text).unwrap();
        assert_eq!(parsed.device.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(parsed.display.accent_color, Some(BRAND_ORANGE));
    }
}
