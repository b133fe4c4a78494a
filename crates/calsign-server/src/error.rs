//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised by the sign device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The serial port could not be opened.
    #[error("failed to open sign on {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Writing to the sign failed.
    #[error("sign write failed: {0}")]
    Io(#[from] io::Error),

    /// The connection has already been closed.
    #[error("sign connection is closed")]
    Closed,
}

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (PID file, signal setup, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Sign device error.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Server is already running.
    #[error("Server is already running (PID file exists: {path})")]
    AlreadyRunning { path: String },

    /// The refresh loop stopped without being asked to.
    #[error("Refresh loop stopped unexpectedly: {message}")]
    LoopAborted { message: String },
}

impl ServerError {
    /// Creates an already running error.
    pub fn already_running(path: impl Into<String>) -> Self {
        Self::AlreadyRunning { path: path.into() }
    }

    pub fn loop_aborted(message: impl Into<String>) -> Self {
        Self::LoopAborted {
            message: message.into(),
        }
    }
}
