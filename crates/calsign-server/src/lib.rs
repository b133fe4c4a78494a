//! The calsign daemon core.
//!
//! - [`RefreshScheduler`] - periodic fetch, render and write
//! - [`DisplaySession`] - debounced writes to a [`SignDevice`]
//! - [`ShutdownCoordinator`] - drain-then-disconnect shutdown
//! - [`SignalHandler`] - SIGINT/SIGHUP/SIGTERM to a shutdown flag
//! - [`PidFile`] - single-instance guard

pub mod device;
pub mod error;
pub mod pidfile;
pub mod scheduler;
pub mod shutdown;
pub mod signals;
pub mod writer;

pub use device::{SerialSign, SerialSignConfig, SignDevice};
pub use error::{DeviceError, ServerError, ServerResult};
pub use pidfile::{PidFile, default_pid_path};
pub use scheduler::{
    ActiveCycle, Clock, LoopActivity, RefreshScheduler, SchedulerConfig, SchedulerState,
    SystemClock,
};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use writer::{DisplaySession, MAX_MESSAGE_LENGTH, WriteOutcome};
