//! Unix signal handling.
//!
//! SIGINT, SIGHUP and SIGTERM all request shutdown. The listener only
//! flips a flag; the refresh loop and the shutdown coordinator observe it
//! and do the actual teardown.

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Turns termination signals into a shutdown request.
#[derive(Default)]
pub struct SignalHandler {
    handle: ShutdownHandle,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the signal handlers and spawns the listener task.
    ///
    /// Handlers are installed before this returns, so a signal arriving
    /// right after startup is not lost. Must be called from within a tokio
    /// runtime.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        let mut int = signal(SignalKind::interrupt())?;
        let mut hup = signal(SignalKind::hangup())?;
        let handle = self.handle.clone();

        tokio::spawn(async move {
            let received = tokio::select! {
                _ = term.recv() => "SIGTERM",
                _ = int.recv() => "SIGINT",
                _ = hup.recv() => "SIGHUP",
            };
            info!(signal = received, "Stop requested");
            handle.trigger();
        });
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> io::Result<()> {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(signal = "ctrl-c", "Stop requested");
                handle.trigger();
            }
        });
        Ok(())
    }

    /// Completes once shutdown is requested.
    pub fn shutdown(&self) -> ShutdownSignal {
        self.handle.wait()
    }

    pub fn is_shutdown(&self) -> bool {
        self.handle.is_shutdown()
    }

    /// Requests shutdown without a signal.
    pub fn trigger_shutdown(&self) {
        self.handle.trigger();
    }

    /// A handle sharing this handler's flag.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }
}

/// Waits for the shutdown flag.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // an Err means every sender is gone, so no request can ever arrive
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}

/// The shared shutdown flag. Cloning shares it.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::detached()
    }
}

impl ShutdownHandle {
    /// A flag not attached to any signal handler.
    pub fn detached() -> Self {
        Self {
            flag: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Sets the flag. Setting it again has no effect.
    pub fn trigger(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.flag.borrow()
    }

    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.flag.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    mod flag {
        use super::*;

        #[test]
        fn starts_clear() {
            let handler = SignalHandler::new();
            assert!(!handler.is_shutdown());
            assert!(!handler.shutdown_handle().is_shutdown());
        }

        #[test]
        fn handles_share_the_handler_flag() {
            let handler = SignalHandler::new();
            let first = handler.shutdown_handle();
            let second = first.clone();

            second.trigger();

            assert!(first.is_shutdown());
            assert!(handler.is_shutdown());
        }

        #[test]
        fn detached_handles_are_independent() {
            let a = ShutdownHandle::detached();
            let b = ShutdownHandle::detached();
            a.trigger();
            assert!(!b.is_shutdown());
        }

        #[test]
        fn trigger_is_idempotent() {
            let handler = SignalHandler::new();
            handler.trigger_shutdown();
            handler.trigger_shutdown();
            assert!(handler.is_shutdown());
        }
    }

    mod waiting {
        use super::*;

        #[tokio::test]
        async fn wakes_on_trigger() {
            let handler = SignalHandler::new();
            let signal = handler.shutdown();
            let handle = handler.shutdown_handle();

            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                handle.trigger();
            });

            let woke = tokio::time::timeout(Duration::from_millis(500), signal.wait()).await;
            assert!(woke.is_ok());
        }

        #[tokio::test]
        async fn returns_at_once_when_already_set() {
            let handle = ShutdownHandle::detached();
            handle.trigger();
            let woke = tokio::time::timeout(Duration::from_millis(50), handle.wait().wait()).await;
            assert!(woke.is_ok());
        }

        #[tokio::test]
        async fn pending_while_clear() {
            let handle = ShutdownHandle::detached();
            let woke = tokio::time::timeout(Duration::from_millis(20), handle.wait().wait()).await;
            assert!(woke.is_err());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn listener_installs_without_requesting_shutdown() {
        let handler = SignalHandler::new();
        assert!(handler.spawn_listener().is_ok());
        assert!(!handler.is_shutdown());
    }
}
