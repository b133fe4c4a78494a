//! Debounced writes to the sign.
//!
//! The session remembers the last text it wrote and skips the device when
//! asked to write the same text again. Signs pause briefly on every write,
//! so unchanged text must never reach the device.

use tracing::{debug, info};

use crate::device::SignDevice;
use crate::error::DeviceError;

/// Longest message the sign accepts, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 126;

/// What [`DisplaySession::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The text matched the current text; nothing was written.
    Unchanged,
    /// The text was written to the device.
    Written { truncated: bool },
    /// The text changed but there is no device (dry run).
    DryRun,
}

/// The connection to the sign plus the text it currently shows.
pub struct DisplaySession {
    device: Option<Box<dyn SignDevice>>,
    current_text: String,
    max_len: usize,
    writes: u64,
}

impl DisplaySession {
    pub fn new(device: Box<dyn SignDevice>) -> Self {
        Self {
            device: Some(device),
            current_text: String::new(),
            max_len: MAX_MESSAGE_LENGTH,
            writes: 0,
        }
    }

    /// A session that renders but never touches a device.
    pub fn dry_run() -> Self {
        Self {
            device: None,
            current_text: String::new(),
            max_len: MAX_MESSAGE_LENGTH,
            writes: 0,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// The last text accepted, before truncation.
    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn is_dry_run(&self) -> bool {
        self.device.is_none()
    }

    /// Number of device writes issued.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Shows `text` on the sign unless it is already showing.
    ///
    /// Issues at most one device write. On failure the current text is
    /// left unchanged, so the next update with the same text tries again.
    pub fn update(&mut self, text: &str) -> Result<WriteOutcome, DeviceError> {
        if text == self.current_text {
            debug!(text, "sign text already set");
            return Ok(WriteOutcome::Unchanged);
        }

        info!(text, "Setting sign message");
        let outcome = match self.device.as_mut() {
            Some(device) => {
                let (shown, truncated) = truncate_chars(text, self.max_len);
                if truncated {
                    debug!(max = self.max_len, "message truncated");
                }
                device.write_text(shown)?;
                self.writes += 1;
                WriteOutcome::Written { truncated }
            }
            None => WriteOutcome::DryRun,
        };

        self.current_text = text.to_string();
        Ok(outcome)
    }

    /// Closes the device connection, consuming the session.
    pub fn disconnect(mut self) -> Result<(), DeviceError> {
        match self.device.take() {
            Some(mut device) => {
                info!(device = device.name(), "Disconnecting sign");
                device.disconnect()
            }
            None => Ok(()),
        }
    }
}

/// Cuts `text` to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
