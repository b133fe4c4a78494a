//! Alpha-protocol signs on a serial (or USB serial) port.

use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use super::SignDevice;
use super::alpha::{self, Mode};
use crate::error::DeviceError;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Connection settings for [`SerialSign`].
#[derive(Debug, Clone)]
pub struct SerialSignConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout: Duration,
    /// Shown right after setup, until the first message is written.
    pub welcome_text: String,
}

impl SerialSignConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(2),
            welcome_text: "calsign".to_string(),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_welcome_text(mut self, text: impl Into<String>) -> Self {
        self.welcome_text = text.into();
        self
    }
}

/// A sign connected over a serial port.
pub struct SerialSign {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialSign {
    /// Opens the port and prepares the sign's memory layout.
    ///
    /// The sign pauses while its memory is reorganized, so this is done
    /// once per process.
    pub fn connect(config: &SerialSignConfig) -> Result<Self, DeviceError> {
        info!(port = %config.port, baud = config.baud_rate, "Initializing sign");
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|source| DeviceError::Open {
                port: config.port.clone(),
                source,
            })?;

        let mut sign = Self {
            name: config.port.clone(),
            port: Some(port),
        };
        sign.send(&alpha::clear_memory())?;
        sign.send(&alpha::beep())?;
        sign.send(&alpha::allocate())?;
        sign.send(&alpha::run_sequence())?;
        sign.send(&alpha::write_message(&config.welcome_text))?;
        sign.send(&alpha::write_text_file(Mode::Rotate))?;
        info!("Finished initialization");
        Ok(sign)
    }

    fn send(&mut self, packet: &[u8]) -> Result<(), DeviceError> {
        let port = self.port.as_mut().ok_or(DeviceError::Closed)?;
        port.write_all(packet)?;
        port.flush()?;
        Ok(())
    }
}

impl SignDevice for SerialSign {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_text(&mut self, text: &str) -> Result<(), DeviceError> {
        debug!(port = %self.name, len = text.len(), "writing message");
        self.send(&alpha::write_message(text))
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        let mut port = self.port.take().ok_or(DeviceError::Closed)?;
        info!(port = %self.name, "Closing connection to sign");
        port.flush()?;
        Ok(())
    }
}
