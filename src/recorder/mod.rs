//! Capture state machine
//!
//! The [`Recorder`] owns one recording session at a time:
//!
//! ```text
//! Idle ──start──▶ Running ◀──resume/pause──▶ Paused
//!                    │                          │
//!                    └──────────stop────────────┴──▶ Stopped ──start──▶ Running
//! ```
//!
//! Three threads touch the session: the capture source's delivery thread
//! (through [`KeySink`]), the watchdog enforcing [`RecorderLimits`], and the
//! reader that polls snapshots. All of them go through a single mutex.

mod state;
mod watchdog;

pub use state::{CaptureSnapshot, SessionStatus};
pub use watchdog::{RecorderLimits, DEFAULT_WATCHDOG_INTERVAL};

use crate::analytics::{HoldEvent, LatencyEvent};
use crate::keyboard::{CaptureError, CaptureSource, KeyCode, KeySink};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use state::SessionState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use thiserror::Error;

/// Errors surfaced by [`Recorder::start`]
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The capture source could not attach; the recorder did not start
    #[error("failed to attach capture source: {0}")]
    Capture(#[from] CaptureError),
    #[error("failed to spawn watchdog thread: {0}")]
    Watchdog(#[from] std::io::Error),
}

/// State reachable from the capture thread and the watchdog
pub(crate) struct Shared {
    state: Mutex<SessionState>,
    source: Mutex<Option<Box<dyn CaptureSource>>>,
}

impl Shared {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // A panic while holding the lock leaves the buffers usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_source(&self) -> MutexGuard<'_, Option<Box<dyn CaptureSource>>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation_matches(state: &SessionState, expected: Option<u64>) -> bool {
        expected.map_or(true, |g| g == state.generation)
    }

    pub(crate) fn pause(&self, expected: Option<u64>) {
        let mut state = self.lock_state();
        if state.status == SessionStatus::Running && Self::generation_matches(&state, expected) {
            state.status = SessionStatus::Paused;
            info!("Recording paused");
        }
    }

    fn resume(&self) {
        let mut state = self.lock_state();
        if state.status == SessionStatus::Paused {
            state.status = SessionStatus::Running;
            state.last_event_instant = Some(Instant::now());
            info!("Recording resumed");
        }
    }

    pub(crate) fn stop(&self, expected: Option<u64>) {
        let stopped = {
            let mut state = self.lock_state();
            if state.status.is_active() && Self::generation_matches(&state, expected) {
                state.status = SessionStatus::Stopped;
                true
            } else {
                false
            }
        };

        if stopped {
            // Outside the state lock: detaching joins the delivery thread,
            // which may be waiting on that lock
            if let Some(source) = self.lock_source().as_mut() {
                source.detach();
            }
            info!("Recording stopped");
        }
    }
}

// Timestamps are taken under the lock so buffers stay in ascending order
impl KeySink for Shared {
    fn on_press(&self, code: KeyCode) {
        let mut state = self.lock_state();
        state.record_press(code, Instant::now());
    }

    fn on_release(&self, code: KeyCode) {
        let mut state = self.lock_state();
        state.record_release(code, Instant::now());
    }
}

/// Session recorder with a background watchdog
pub struct Recorder {
    shared: Arc<Shared>,
    limits: RecorderLimits,
    watchdog: Option<JoinHandle<()>>,
}

impl Recorder {
    /// A recorder without a capture source; events arrive through [`Recorder::sink`]
    pub fn new(limits: RecorderLimits) -> Self {
        Self::build(limits, None)
    }

    pub fn with_source(limits: RecorderLimits, source: Box<dyn CaptureSource>) -> Self {
        Self::build(limits, Some(source))
    }

    fn build(limits: RecorderLimits, source: Option<Box<dyn CaptureSource>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::new()),
                source: Mutex::new(source),
            }),
            limits,
            watchdog: None,
        }
    }

    pub fn limits(&self) -> RecorderLimits {
        self.limits
    }

    /// Takes effect on the next `start`
    pub fn set_limits(&mut self, limits: RecorderLimits) {
        self.limits = limits;
    }

    /// Handle that feeds events into this recorder
    pub fn sink(&self) -> Arc<dyn KeySink> {
        self.shared.clone()
    }

    /// Begin a new session. No-op while a session is running or paused.
    ///
    /// On capture failure the recorder keeps its previous status and data.
    pub fn start(&mut self, started_at: DateTime<Utc>) -> Result<(), RecorderError> {
        if self.status().is_active() {
            debug!("start ignored: session already active");
            return Ok(());
        }
        self.join_watchdog();

        if let Some(source) = self.shared.lock_source().as_mut() {
            if source.is_attached() {
                source.detach();
            }
            let sink: Arc<dyn KeySink> = self.shared.clone();
            if let Err(e) = source.attach(sink) {
                warn!("Recording not started: {}", e);
                return Err(e.into());
            }
        }

        let generation = {
            let mut state = self.shared.lock_state();
            state.clear_buffers();
            state.generation += 1;
            state.started_at = Some(started_at);
            state.start_instant = Some(Instant::now());
            state.last_event_instant = None;
            state.status = SessionStatus::Running;
            state.generation
        };

        let shared = self.shared.clone();
        let limits = self.limits;
        let spawned = thread::Builder::new()
            .name("kdyn-watchdog".to_string())
            .spawn(move || watchdog::run(shared, limits, generation));

        match spawned {
            Ok(handle) => self.watchdog = Some(handle),
            Err(e) => {
                self.shared.stop(Some(generation));
                return Err(e.into());
            }
        }

        info!(
            "Recording started (max {:?}, idle timeout {:?})",
            self.limits.max_duration, self.limits.idle_timeout
        );
        Ok(())
    }

    pub fn pause(&self) {
        self.shared.pause(None);
    }

    /// Resume a paused session and restart the idle timer
    pub fn resume(&self) {
        self.shared.resume();
    }

    /// Pause when running, resume when paused. Returns the resulting status.
    pub fn toggle_pause(&self) -> SessionStatus {
        match self.status() {
            SessionStatus::Running => self.pause(),
            SessionStatus::Paused => self.resume(),
            SessionStatus::Idle | SessionStatus::Stopped => {}
        }
        self.status()
    }

    /// Detach the capture source and halt the watchdog. Idempotent.
    pub fn stop(&mut self) {
        self.shared.stop(None);
        self.join_watchdog();
    }

    /// Stop, then optionally discard all buffered data
    pub fn reset(&mut self, clear_data: bool) {
        self.stop();
        if clear_data {
            self.shared.lock_state().clear_session();
            info!("Recorder reset");
        }
    }

    fn join_watchdog(&mut self) {
        if let Some(handle) = self.watchdog.take() {
            let _ = handle.join();
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.lock_state().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status() == SessionStatus::Paused
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.shared.lock_state().started_at
    }

    /// Whole seconds since the session started, 0 if never started
    pub fn duration_secs(&self) -> u64 {
        self.shared.lock_state().duration_secs()
    }

    pub fn total_events(&self) -> u64 {
        self.shared.lock_state().total_events
    }

    pub fn holds(&self) -> Vec<HoldEvent> {
        self.shared.lock_state().holds.clone()
    }

    pub fn latencies(&self) -> Vec<LatencyEvent> {
        self.shared.lock_state().latencies.clone()
    }

    pub fn press_timestamps_ms(&self) -> Vec<f64> {
        self.shared.lock_state().press_timestamps_ms.clone()
    }

    /// All buffers at once; `None` if no session was ever started
    pub fn snapshot(&self) -> Option<CaptureSnapshot> {
        self.shared.lock_state().snapshot()
    }
}

impl KeySink for Recorder {
    fn on_press(&self, code: KeyCode) {
        self.shared.on_press(code);
    }

    fn on_release(&self, code: KeyCode) {
        self.shared.on_release(code);
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(RecorderLimits::default())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop();
    }
}
