//! CLI error types.

use std::fmt;

/// Result type for CLI operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end the `calsign` process.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Logging could not be set up.
    Logging(String),
    /// The sign could not be opened.
    Device(String),
    /// Daemon error (PID file, signal setup, refresh loop).
    Server(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Logging(msg) => write!(f, "logging error: {}", msg),
            Self::Device(msg) => write!(f, "sign error: {}", msg),
            Self::Server(msg) => write!(f, "daemon error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<calsign_server::ServerError> for ClientError {
    fn from(err: calsign_server::ServerError) -> Self {
        Self::Server(err.to_string())
    }
}

impl From<calsign_server::DeviceError> for ClientError {
    fn from(err: calsign_server::DeviceError) -> Self {
        Self::Device(err.to_string())
    }
}

impl From<calsign_core::TracingError> for ClientError {
    fn from(err: calsign_core::TracingError) -> Self {
        Self::Logging(err.to_string())
    }
}
