//! In-memory sign for tests.

use std::sync::{Arc, Mutex};

use super::SignDevice;
use crate::error::DeviceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Write(String),
    Disconnect,
}

/// Records every call; optionally fails writes.
#[derive(Clone, Default)]
pub struct RecordingSign {
    calls: Arc<Mutex<Vec<DeviceCall>>>,
    fail_writes: Arc<Mutex<bool>>,
    closed: bool,
}

impl RecordingSign {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::Write(text) => Some(text),
                DeviceCall::Disconnect => None,
            })
            .collect()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }
}

impl SignDevice for RecordingSign {
    fn name(&self) -> &str {
        "recording"
    }

    fn write_text(&mut self, text: &str) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        if *self.fail_writes.lock().unwrap() {
            return Err(DeviceError::Io(std::io::Error::other("sign unplugged")));
        }
        self.calls
            .lock()
            .unwrap()
            .push(DeviceCall::Write(text.to_string()));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        self.closed = true;
        self.calls.lock().unwrap().push(DeviceCall::Disconnect);
        Ok(())
    }
}
