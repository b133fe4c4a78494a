//! Drain-then-disconnect shutdown.
//!
//! The coordinator owns everything that must be torn down: it runs the
//! refresh loop in a task, waits for a shutdown request, waits for the
//! in-flight cycle to finish, takes the display session back from the
//! loop and disconnects it, then removes the PID file.
//!
//! Signal delivery only sets the shutdown flag. The device is touched
//! solely by the loop task and then, once the loop has returned it, by the
//! coordinator.

use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};
use crate::pidfile::PidFile;
use crate::scheduler::{LoopActivity, RefreshScheduler};
use crate::signals::{ShutdownHandle, SignalHandler};

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    /// Whether the device (if any) disconnected cleanly.
    pub disconnected: bool,
    /// Whether a cycle was in flight when shutdown was requested.
    pub drained_active_cycle: bool,
}

/// Runs the refresh loop and tears it down on request.
pub struct ShutdownCoordinator {
    signals: SignalHandler,
    pid_file: Option<PidFile>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(SignalHandler::new())
    }
}

impl ShutdownCoordinator {
    pub fn new(signals: SignalHandler) -> Self {
        Self {
            signals,
            pid_file: None,
        }
    }

    /// Takes ownership of the PID file so it is removed last.
    pub fn with_pid_file(mut self, pid_file: PidFile) -> Self {
        self.pid_file = Some(pid_file);
        self
    }

    /// A handle for requesting shutdown from elsewhere.
    pub fn handle(&self) -> ShutdownHandle {
        self.signals.shutdown_handle()
    }

    /// Requests shutdown. The loop stops at its next check.
    pub fn request_stop(&self) {
        self.signals.trigger_shutdown();
    }

    /// Waits until no refresh cycle is in flight.
    pub async fn drain(activity: &LoopActivity) -> bool {
        let was_active = activity.is_active();
        if was_active {
            info!("Waiting for the refresh cycle in progress to finish");
        }
        activity.wait_idle().await;
        was_active
    }

    /// Runs `scheduler` until shutdown is requested, then drains it,
    /// disconnects the device and removes the PID file.
    ///
    /// # Errors
    ///
    /// Returns an error only if the refresh loop task panicked. Teardown
    /// failures are logged and reported in the [`ShutdownReport`].
    pub async fn run(self, scheduler: RefreshScheduler) -> ServerResult<ShutdownReport> {
        let activity = scheduler.activity();
        let handle = self.signals.shutdown_handle();
        let mut task = tokio::spawn(scheduler.run(handle.clone()));

        let (session, drained_active_cycle) = tokio::select! {
            _ = handle.wait().wait() => {
                info!("Shutting down");
                let drained = Self::drain(&activity).await;
                let session = (&mut task)
                    .await
                    .map_err(|e| ServerError::loop_aborted(e.to_string()))?;
                (session, drained)
            }
            result = &mut task => {
                let session = result.map_err(|e| ServerError::loop_aborted(e.to_string()))?;
                (session, false)
            }
        };

        let disconnected = match session.disconnect() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to disconnect sign");
                false
            }
        };

        if let Some(pid_file) = self.pid_file {
            pid_file.release();
        }

        info!("Shutdown complete");
        Ok(ShutdownReport {
            disconnected,
            drained_active_cycle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{DeviceCall, RecordingSign};
    use crate::scheduler::SchedulerConfig;
    use crate::scheduler::tests::{FixedClock, review_payload};
    use crate::writer::DisplaySession;
    use calsign_core::{MessageRenderer, TimeWindow};
    use calsign_providers::{BoxFuture, CalendarSource, ProviderResult, StaticSource};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// A source whose fetch blocks until released.
    struct GatedSource {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl CalendarSource for GatedSource {
        fn name(&self) -> &str {
            "gated"
        }

        fn fetch_events(&self, _window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>> {
            let started = self.started.clone();
            let release = self.release.clone();
            Box::pin(async move {
                started.notify_one();
                release.notified().await;
                Ok(review_payload())
            })
        }
    }

    fn scheduler(source: Box<dyn CalendarSource>, sign: &RecordingSign) -> RefreshScheduler {
        RefreshScheduler::new(
            source,
            MessageRenderer::with_defaults(),
            DisplaySession::new(Box::new(sign.clone())),
            SchedulerConfig::default(),
        )
        .with_clock(FixedClock::at(9, 0))
    }

    #[tokio::test]
    async fn shutdown_waits_for_active_cycle() {
        let sign = RecordingSign::new();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let source = GatedSource {
            started: started.clone(),
            release: release.clone(),
        };

        let scheduler = scheduler(Box::new(source), &sign);
        let activity = scheduler.activity();
        let coordinator = ShutdownCoordinator::default();
        let handle = coordinator.handle();
        let run = tokio::spawn(coordinator.run(scheduler));

        started.notified().await;
        assert!(activity.is_active());
        handle.trigger();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sign.calls().is_empty(), "device touched mid-cycle");
        assert!(!run.is_finished());

        release.notify_one();
        let report = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(report.drained_active_cycle);
        assert!(report.disconnected);
        assert_eq!(
            sign.calls(),
            vec![
                DeviceCall::Write("\x1c8Review in 30m".into()),
                DeviceCall::Disconnect
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_shutdown_disconnects_once() {
        let sign = RecordingSign::new();
        let scheduler = scheduler(
            Box::new(StaticSource::new("static", review_payload())),
            &sign,
        );
        let coordinator = ShutdownCoordinator::default();
        coordinator.request_stop();

        let report = coordinator.run(scheduler).await.unwrap();

        assert!(!report.drained_active_cycle);
        assert!(report.disconnected);
        assert_eq!(sign.calls(), vec![DeviceCall::Disconnect]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_cycles_releases_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("calsign.pid");
        let pid_file = PidFile::create(&pid_path).unwrap();

        let sign = RecordingSign::new();
        let scheduler = scheduler(
            Box::new(StaticSource::new("static", review_payload())),
            &sign,
        );
        let coordinator = ShutdownCoordinator::default().with_pid_file(pid_file);
        let handle = coordinator.handle();
        let run = tokio::spawn(coordinator.run(scheduler));

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert!(pid_path.exists());
        handle.trigger();
        run.await.unwrap().unwrap();

        assert!(!pid_path.exists());
        assert_eq!(sign.writes().len(), 1);
        assert_eq!(sign.calls().last(), Some(&DeviceCall::Disconnect));
    }

    #[tokio::test]
    async fn dry_run_shutdown() {
        let scheduler = RefreshScheduler::new(
            Box::new(StaticSource::new("static", review_payload())),
            MessageRenderer::with_defaults(),
            DisplaySession::dry_run(),
            SchedulerConfig::default(),
        );
        let coordinator = ShutdownCoordinator::default();
        coordinator.request_stop();

        let report = coordinator.run(scheduler).await.unwrap();
        assert!(report.disconnected);
    }
}
