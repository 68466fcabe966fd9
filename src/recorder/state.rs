//! Session status and the mutex-guarded capture buffers

use crate::analytics::{aggregate_with_threshold, HoldEvent, LatencyEvent, Metrics};
use crate::keyboard::KeyCode;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifecycle status of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session, no watchdog, events ignored
    Idle,
    Running,
    Paused,
    /// Session finished; buffers kept for inspection until the next start
    Stopped,
}

impl SessionStatus {
    /// A session exists and may still accept events after a resume
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RECORDING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
        }
    }
}

pub(crate) fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Everything the ingestion path, the watchdog and the readers share
#[derive(Debug)]
pub(crate) struct SessionState {
    pub status: SessionStatus,
    /// Bumped on every start so a stale watchdog can recognise its session is gone
    pub generation: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub start_instant: Option<Instant>,
    pub last_event_instant: Option<Instant>,
    pub total_events: u64,
    pub holds: Vec<HoldEvent>,
    pub latencies: Vec<LatencyEvent>,
    pub press_timestamps_ms: Vec<f64>,
    pending_presses: HashMap<KeyCode, Instant>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            generation: 0,
            started_at: None,
            start_instant: None,
            last_event_instant: None,
            total_events: 0,
            holds: Vec::new(),
            latencies: Vec::new(),
            press_timestamps_ms: Vec::new(),
            pending_presses: HashMap::new(),
        }
    }

    pub fn clear_buffers(&mut self) {
        self.total_events = 0;
        self.holds.clear();
        self.latencies.clear();
        self.press_timestamps_ms.clear();
        self.pending_presses.clear();
    }

    /// Back to the blank state of a recorder that never ran
    pub fn clear_session(&mut self) {
        self.clear_buffers();
        self.started_at = None;
        self.start_instant = None;
        self.last_event_instant = None;
        self.status = SessionStatus::Idle;
    }

    /// Reference point for the idle timeout. `None` until the first accepted
    /// event or a resume, so an untouched session never auto-pauses.
    pub fn idle_since(&self) -> Option<Instant> {
        self.last_event_instant
    }

    pub fn record_press(&mut self, code: KeyCode, now: Instant) {
        if self.status != SessionStatus::Running {
            return;
        }
        self.total_events += 1;
        // A re-press before release overwrites the pending timestamp
        self.pending_presses.insert(code, now);

        let start = self.start_instant.unwrap_or(now);
        self.press_timestamps_ms.push(as_ms(now.duration_since(start)));

        if let Some(previous) = self.last_event_instant {
            self.latencies.push(LatencyEvent {
                latency_ms: as_ms(now.duration_since(previous)),
            });
        }
        self.last_event_instant = Some(now);
    }

    pub fn record_release(&mut self, code: KeyCode, now: Instant) {
        if self.status != SessionStatus::Running {
            return;
        }
        if let Some(pressed_at) = self.pending_presses.remove(&code) {
            // duration_since saturates at zero, holds are never negative
            self.holds.push(HoldEvent {
                code,
                hold_ms: as_ms(now.duration_since(pressed_at)),
            });
        }
        self.last_event_instant = Some(now);
    }

    pub fn duration_secs(&self) -> u64 {
        self.start_instant
            .map(|start| start.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> Option<CaptureSnapshot> {
        let started_at = self.started_at?;
        Some(CaptureSnapshot {
            status: self.status,
            started_at,
            duration_secs: self.duration_secs(),
            total_events: self.total_events,
            holds: self.holds.clone(),
            latencies: self.latencies.clone(),
            press_timestamps_ms: self.press_timestamps_ms.clone(),
        })
    }
}

/// Consistent copy of the capture buffers taken under one lock
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSnapshot {
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub total_events: u64,
    pub holds: Vec<HoldEvent>,
    pub latencies: Vec<LatencyEvent>,
    pub press_timestamps_ms: Vec<f64>,
}

impl CaptureSnapshot {
    pub fn aggregate(&self, session_id: &str, burst_threshold_ms: f64) -> Metrics {
        aggregate_with_threshold(
            session_id,
            self.started_at,
            self.duration_secs,
            self.total_events,
            &self.holds,
            &self.latencies,
            &self.press_timestamps_ms,
            burst_threshold_ms,
        )
    }
}
