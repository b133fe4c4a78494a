//! The sign device seam.
//!
//! A [`SignDevice`] is an open connection to a sign. It is owned by the
//! [`crate::DisplaySession`] and driven only from the refresh loop.

pub mod alpha;
#[cfg(test)]
pub(crate) mod mock;
mod serial;

pub use serial::{DEFAULT_BAUD_RATE, SerialSign, SerialSignConfig};

use crate::error::DeviceError;

/// An open connection to a message sign.
pub trait SignDevice: Send {
    /// Short description used in logs.
    fn name(&self) -> &str;

    /// Replaces the text shown on the sign.
    fn write_text(&mut self, text: &str) -> Result<(), DeviceError>;

    /// Closes the connection. Later writes fail with [`DeviceError::Closed`].
    fn disconnect(&mut self) -> Result<(), DeviceError>;
}
