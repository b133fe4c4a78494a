//! Tracing setup for calsign
//!
//! The default output is one line per event in the sign log format:
//!
//! ```text
//! 2025-06-10 10:00:00.42 - Setting sign message text="Review in 30m"
//! ```
//!
//! Logs go to standard output or are appended to a named file.
//!
//! # Usage
//!
//! ```ignore
//! use calsign_core::tracing::{init_tracing, LogSink, TracingConfig};
//!
//! init_tracing(TracingConfig::default().with_sink(LogSink::File("calsign.log".into())))?;
//! ```

use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        FmtContext, FormatEvent, FormatFields,
        format::Writer,
        writer::BoxMakeWriter,
    },
    prelude::*,
    registry::LookupSpan,
};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    /// Failed to open the log file
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// `YYYY-MM-DD HH:MM:SS.hh - message` lines (default)
    #[default]
    Sign,
    /// Compact single-line format with level and target
    Compact,
    /// JSON format
    Json,
}

/// Where log lines are written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogSink {
    #[default]
    Stdout,
    /// Append to a file, creating it if needed
    File(PathBuf),
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// The default log level when RUST_LOG is not set
    pub default_level: Level,
    /// Output format for log messages
    pub output_format: TracingOutputFormat,
    /// Destination for log lines
    pub sink: LogSink,
    /// Custom env filter directive (overrides default_level if set)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Sign,
            sink: LogSink::Stdout,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Debug mode: verbose, always on stdout
    #[must_use]
    pub fn debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS.hh` (hundredths of a second).
pub fn format_log_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!(
        "{}.{:02}",
        time.format("%Y-%m-%d %H:%M:%S"),
        time.timestamp_subsec_millis().min(999) / 10
    )
}

/// Event formatter producing `<timestamp> - <message> <fields>` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignLineFormat;

impl<S, N> FormatEvent<S, N> for SignLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{} - ", format_log_timestamp(&Local::now()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn make_writer(sink: &LogSink) -> Result<BoxMakeWriter, TracingError> {
    match sink {
        LogSink::Stdout => Ok(BoxMakeWriter::new(std::io::stdout)),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TracingError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// This should be called once at the start of the application.
/// The `RUST_LOG` environment variable can be used to override the default level.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set, the env
/// filter directive is invalid, or the log file cannot be opened.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = if let Some(ref filter) = config.env_filter {
        EnvFilter::try_new(filter)?
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()))
    };

    let writer = make_writer(&config.sink)?;
    let ansi = config.sink == LogSink::Stdout;

    match config.output_format {
        TracingOutputFormat::Sign => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .event_format(SignLineFormat)
                    .with_ansi(false)
                    .with_writer(writer),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
        TracingOutputFormat::Compact => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_writer(writer),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
        TracingOutputFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(writer),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
