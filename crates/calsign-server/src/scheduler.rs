//! The refresh loop.
//!
//! Every poll interval the loop checks whether the update interval has
//! elapsed since the last cycle started. If so it runs one refresh cycle:
//! fetch, normalize, render, debounced write. The start time is recorded
//! before the cycle runs, so a slow fetch does not push the next cycle
//! back by its own duration.
//!
//! Shutdown is cooperative. The loop checks the shutdown flag between
//! cycles and never abandons a cycle halfway; [`LoopActivity`] tells the
//! shutdown path when a cycle is in flight.

use std::sync::Arc;
use std::time::Duration;

use calsign_core::{MessageRenderer, RenderedMessage, TimeWindow};
use calsign_providers::{CalendarSource, normalize_events};
use chrono::{DateTime, FixedOffset, Local, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::ServerResult;
use crate::signals::ShutdownHandle;
use crate::writer::{DisplaySession, WriteOutcome};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minimum time between the starts of two refresh cycles.
    pub update_interval: Duration,
    /// How often the loop wakes to check the interval and the shutdown flag.
    pub poll_interval: Duration,
    /// How far ahead events are fetched.
    pub lookahead: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            lookahead: chrono::Duration::days(calsign_core::time::DEFAULT_LOOKAHEAD_DAYS),
        }
    }
}

impl SchedulerConfig {
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_lookahead(mut self, lookahead: chrono::Duration) -> Self {
        self.lookahead = lookahead;
        self
    }
}

/// Source of wall-clock time for rendering.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system clock, read in a configured zone or the system one.
///
/// The offset of `now` is the offset event times are shown in, so a sign
/// in another office can follow that office's clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    zone: Option<Tz>,
}

impl SystemClock {
    /// Follows the system time zone.
    pub fn local() -> Self {
        Self { zone: None }
    }

    pub fn in_zone(zone: Tz) -> Self {
        Self { zone: Some(zone) }
    }

    pub fn zone(&self) -> Option<Tz> {
        self.zone
    }

    /// `instant` as seen in `zone`, or in the system zone.
    pub fn zoned(instant: DateTime<Utc>, zone: Option<Tz>) -> DateTime<FixedOffset> {
        match zone {
            Some(zone) => instant.with_timezone(&zone).fixed_offset(),
            None => instant.with_timezone(&Local).fixed_offset(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Self::zoned(Utc::now(), self.zone)
    }
}

/// Loop bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// When the last cycle started.
    pub last_run: Option<Instant>,
    /// Cycles started.
    pub cycles: u64,
    /// Cycles that ended in a device error.
    pub failed_cycles: u64,
}

/// Whether a refresh cycle is in flight.
///
/// Cloneable; every clone observes the same flag.
#[derive(Debug, Clone)]
pub struct LoopActivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for LoopActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopActivity {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_active(&self) -> bool {
        *self.tx.borrow()
    }

    /// Marks a cycle as started. The cycle ends when the guard is dropped.
    pub fn begin(&self) -> ActiveCycle {
        self.tx.send_replace(true);
        ActiveCycle {
            tx: self.tx.clone(),
        }
    }

    /// Waits until no cycle is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|active| !*active).await;
    }
}

/// Guard returned by [`LoopActivity::begin`].
#[derive(Debug)]
pub struct ActiveCycle {
    tx: Arc<watch::Sender<bool>>,
}

impl Drop for ActiveCycle {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}

/// Drives refresh cycles until shutdown.
pub struct RefreshScheduler {
    source: Box<dyn CalendarSource>,
    renderer: MessageRenderer,
    session: DisplaySession,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    activity: LoopActivity,
    state: SchedulerState,
}

impl RefreshScheduler {
    pub fn new(
        source: Box<dyn CalendarSource>,
        renderer: MessageRenderer,
        session: DisplaySession,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            renderer,
            session,
            config,
            clock: Arc::new(SystemClock::local()),
            activity: LoopActivity::new(),
            state: SchedulerState::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn session(&self) -> &DisplaySession {
        &self.session
    }

    /// A handle on the in-flight flag, for the shutdown path.
    pub fn activity(&self) -> LoopActivity {
        self.activity.clone()
    }

    /// Returns true if a cycle should start at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.state.last_run {
            None => true,
            Some(last) => now.duration_since(last) > self.config.update_interval,
        }
    }

    /// Fetches and renders the current message without writing it.
    ///
    /// A failed fetch renders the error display.
    pub async fn compute(&self) -> RenderedMessage {
        compute_message(
            self.source.as_ref(),
            &self.renderer,
            self.clock.as_ref(),
            self.config.lookahead,
        )
        .await
    }

    /// Runs one refresh cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails. Fetch failures are not
    /// errors; they render the error display.
    pub async fn run_cycle(&mut self) -> ServerResult<RenderedMessage> {
        // borrow fields, not `self`: the session is Send but not Sync
        let message = compute_message(
            self.source.as_ref(),
            &self.renderer,
            self.clock.as_ref(),
            self.config.lookahead,
        )
        .await;
        let outcome = self.session.update(&message.text)?;
        debug!(
            state = message.state.kind(),
            written = !matches!(outcome, WriteOutcome::Unchanged),
            "refresh cycle complete"
        );
        Ok(message)
    }

    /// Runs the loop until `shutdown` is triggered, then hands back the
    /// display session for disconnection.
    pub async fn run(mut self, shutdown: ShutdownHandle) -> DisplaySession {
        info!(
            source = self.source.name(),
            interval_secs = self.config.update_interval.as_secs(),
            dry_run = self.session.is_dry_run(),
            "Refresh loop started"
        );

        while !shutdown.is_shutdown() {
            let now = Instant::now();
            if self.is_due(now) {
                self.state.last_run = Some(now);
                self.state.cycles += 1;

                let _active = self.activity.begin();
                if let Err(e) = self.run_cycle().await {
                    self.state.failed_cycles += 1;
                    error!(error = %e, "refresh cycle failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.wait().wait() => {}
            }
        }

        info!(
            cycles = self.state.cycles,
            failed = self.state.failed_cycles,
            "Refresh loop stopped"
        );
        self.session
    }
}

async fn compute_message(
    source: &dyn CalendarSource,
    renderer: &MessageRenderer,
    clock: &dyn Clock,
    lookahead: chrono::Duration,
) -> RenderedMessage {
    let now = clock.now();
    debug!(now = %now, "Regenerating message");

    let window = TimeWindow::from_now(&now, lookahead);
    match source.fetch_events(window).await {
        Ok(payload) => {
            let timeline = normalize_events(&payload);
            debug!(events = timeline.len(), "Done fetching events");
            renderer.render_at(&now, &timeline)
        }
        Err(e) => {
            warn!(source = source.name(), error = %e, "calendar fetch failed");
            renderer.render_failure(e.to_string())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::device::mock::RecordingSign;
    use calsign_core::{DisplayState, NoDataReason};
    use calsign_providers::{BoxFuture, ErrorSource, ProviderError, ProviderResult, StaticSource};
    use chrono::TimeZone;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    pub(crate) struct FixedClock(pub Mutex<DateTime<FixedOffset>>);

    impl FixedClock {
        pub(crate) fn at(h: u32, m: u32) -> Arc<Self> {
            let tz = FixedOffset::east_opt(0).unwrap();
            Arc::new(Self(Mutex::new(
                tz.with_ymd_and_hms(2025, 3, 4, h, m, 0).unwrap(),
            )))
        }

        fn set(&self, h: u32, m: u32) {
            let tz = FixedOffset::east_opt(0).unwrap();
            *self.0.lock().unwrap() = tz.with_ymd_and_hms(2025, 3, 4, h, m, 0).unwrap();
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<FixedOffset> {
            *self.0.lock().unwrap()
        }
    }

    /// Counts fetches and returns a fixed payload.
    pub(crate) struct CountingSource {
        pub payload: Value,
        pub fetches: Arc<Mutex<u32>>,
    }

    impl CalendarSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch_events(&self, _window: TimeWindow) -> BoxFuture<'_, ProviderResult<Value>> {
            *self.fetches.lock().unwrap() += 1;
            let payload = self.payload.clone();
            Box::pin(async move { Ok(payload) })
        }
    }

    pub(crate) fn review_payload() -> Value {
        json!({"items": [{
            "summary": "Review",
            "start": {"dateTime": "2025-03-04T09:30:00Z"},
            "end": {"dateTime": "2025-03-04T10:00:00Z"}
        }]})
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

    mod cycles {
        use super::*;

        #[tokio::test]
        async fn cycle_renders_and_writes() {
            let sign = RecordingSign::new();
            let mut scheduler =
                scheduler(Box::new(StaticSource::new("static", review_payload())), &sign);

            let message = scheduler.run_cycle().await.unwrap();

            assert!(matches!(message.state, DisplayState::Upcoming { .. }));
            assert_eq!(sign.writes(), vec!["\x1c8Review in 30m".to_string()]);
        }

        #[tokio::test]
        async fn repeated_cycle_does_not_rewrite() {
            let sign = RecordingSign::new();
            let mut scheduler =
                scheduler(Box::new(StaticSource::new("static", review_payload())), &sign);

            scheduler.run_cycle().await.unwrap();
            scheduler.run_cycle().await.unwrap();

            assert_eq!(sign.writes().len(), 1);
        }

        #[tokio::test]
        async fn fetch_failure_renders_error_text() {
            let sign = RecordingSign::new();
            let source = ErrorSource::new("google", ProviderError::network("offline"));
            let mut scheduler = scheduler(Box::new(source), &sign);

            let message = scheduler.run_cycle().await.unwrap();

            assert_eq!(message.state.no_data_reason(), Some(NoDataReason::FetchFailed));
            assert_eq!(
                sign.writes(),
                vec!["\x1c1Error: could not retrieve calendar data".to_string()]
            );
        }

        #[tokio::test]
        async fn malformed_payload_renders_no_data() {
            let sign = RecordingSign::new();
            let source = StaticSource::new("static", json!("garbage"));
            let mut scheduler = scheduler(Box::new(source), &sign);

            let message = scheduler.run_cycle().await.unwrap();
            assert_eq!(message.state, DisplayState::NoData(NoDataReason::EmptyTimeline));
        }

        #[tokio::test]
        async fn device_failure_propagates() {
            let sign = RecordingSign::new();
            sign.set_fail_writes(true);
            let mut scheduler =
                scheduler(Box::new(StaticSource::new("static", review_payload())), &sign);

            assert!(scheduler.run_cycle().await.is_err());
            assert_eq!(scheduler.session().current_text(), "");
        }

        #[tokio::test]
        async fn clock_drives_rendering() {
            let sign = RecordingSign::new();
            let clock = FixedClock::at(9, 0);
            let mut scheduler =
                scheduler(Box::new(StaticSource::new("static", review_payload())), &sign)
                    .with_clock(clock.clone());

            scheduler.run_cycle().await.unwrap();
            clock.set(9, 45);
            let message = scheduler.run_cycle().await.unwrap();

            assert!(matches!(message.state, DisplayState::InProgress { .. }));
            assert_eq!(sign.writes().len(), 2);
        }
    }

    mod timing {
        use super::*;

        #[test]
        fn first_check_is_due() {
            let sign = RecordingSign::new();
            let scheduler = scheduler(Box::new(StaticSource::new("s", json!([]))), &sign);
            assert!(scheduler.is_due(Instant::now()));
        }

        #[tokio::test(start_paused = true)]
        async fn due_only_after_interval_exceeded() {
            let sign = RecordingSign::new();
            let mut scheduler = scheduler(Box::new(StaticSource::new("s", json!([]))), &sign);
            let start = Instant::now();
            scheduler.state.last_run = Some(start);

            assert!(!scheduler.is_due(start + Duration::from_secs(59)));
            assert!(!scheduler.is_due(start + Duration::from_secs(60)));
            assert!(scheduler.is_due(start + Duration::from_secs(61)));
        }

        #[tokio::test(start_paused = true)]
        async fn loop_refreshes_once_per_interval() {
            let sign = RecordingSign::new();
            let fetches = Arc::new(Mutex::new(0));
            let source = CountingSource {
                payload: review_payload(),
                fetches: fetches.clone(),
            };
            let scheduler = scheduler(Box::new(source), &sign);
            let shutdown = ShutdownHandle::detached();

            let task = tokio::spawn(scheduler.run(shutdown.clone()));
            // cycles at 0s and 61s; the next would be at 122s
            tokio::time::sleep(Duration::from_secs(90)).await;
            shutdown.trigger();
            let session = task.await.unwrap();

            assert_eq!(*fetches.lock().unwrap(), 2);
            assert_eq!(session.writes(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn loop_survives_device_errors() {
            let sign = RecordingSign::new();
            sign.set_fail_writes(true);
            let scheduler =
                scheduler(Box::new(StaticSource::new("static", review_payload())), &sign);
            let shutdown = ShutdownHandle::detached();

            let task = tokio::spawn(scheduler.run(shutdown.clone()));
            tokio::time::sleep(Duration::from_secs(30)).await;
            sign.set_fail_writes(false);
            tokio::time::sleep(Duration::from_secs(60)).await;
            shutdown.trigger();
            task.await.unwrap();

            assert_eq!(sign.writes(), vec!["\x1c8Review in 30m".to_string()]);
        }

        #[tokio::test(start_paused = true)]
        async fn shutdown_before_start_runs_no_cycle() {
            let sign = RecordingSign::new();
            let scheduler =
                scheduler(Box::new(StaticSource::new("static", review_payload())), &sign);
            let shutdown = ShutdownHandle::detached();
            shutdown.trigger();

            scheduler.run(shutdown).await;
            assert!(sign.writes().is_empty());
        }
    }

    mod activity {
        use super::*;

        #[test]
        fn guard_clears_flag() {
            let activity = LoopActivity::new();
            assert!(!activity.is_active());
            {
                let _cycle = activity.begin();
                assert!(activity.clone().is_active());
            }
            assert!(!activity.is_active());
        }

        #[tokio::test]
        async fn wait_idle_returns_when_idle() {
            let activity = LoopActivity::new();
            tokio::time::timeout(Duration::from_millis(100), activity.wait_idle())
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn wait_idle_waits_for_cycle() {
            let activity = LoopActivity::new();
            let cycle = activity.begin();

            let waiter = {
                let activity = activity.clone();
                tokio::spawn(async move { activity.wait_idle().await })
            };
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!waiter.is_finished());

            drop(cycle);
            tokio::time::timeout(Duration::from_millis(500), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }

    mod zones {
        use super::*;
        use calsign_core::{CalendarEvent, EventTimeline, RenderOptions};

        fn utc(h: u32, m: u32) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2025, 3, 4, h, m, 0).unwrap()
        }

        #[test]
        fn zoned_now_carries_the_zone_offset() {
            let eastern = SystemClock::zoned(utc(14, 10), Some(chrono_tz::US::Eastern));
            assert_eq!(eastern.offset().local_minus_utc(), -5 * 3600);
            assert_eq!(eastern.naive_local().time().to_string(), "09:10:00");

            let kolkata = SystemClock::zoned(utc(14, 10), Some(chrono_tz::Asia::Kolkata));
            assert_eq!(kolkata.offset().local_minus_utc(), 19_800);
        }

        #[test]
        fn event_times_render_in_the_configured_zone() {
            let renderer = MessageRenderer::new(RenderOptions {
                accent_color: None,
                ..Default::default()
            });
            let timeline = EventTimeline::new(vec![CalendarEvent::new(
                "Sync",
                utc(14, 0).fixed_offset(),
                utc(15, 0).fixed_offset(),
            )]);

            let now = SystemClock::zoned(utc(14, 10), Some(chrono_tz::US::Eastern));
            assert_eq!(renderer.render_at(&now, &timeline).text, "Sync / 9:00-10:00");

            let now = SystemClock::zoned(utc(14, 10), Some(chrono_tz::Europe::Paris));
            assert_eq!(renderer.render_at(&now, &timeline).text, "Sync / 3:00-4:00");
        }

        #[test]
        fn clock_reports_its_zone() {
            assert_eq!(SystemClock::local().zone(), None);
            let clock = SystemClock::in_zone(chrono_tz::US::Eastern);
            assert_eq!(clock.zone(), Some(chrono_tz::US::Eastern));
            let offset = clock.now().offset().local_minus_utc();
            assert!(offset == -5 * 3600 || offset == -4 * 3600);
        }
    }
}
