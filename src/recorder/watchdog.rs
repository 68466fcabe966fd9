//! Background enforcement of the max-duration and idle-timeout policies

use super::{SessionStatus, Shared};
use log::{debug, info};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default watchdog wake-up interval
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_millis(50);

/// Session limits enforced by the watchdog. A zero duration disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderLimits {
    pub max_duration: Duration,
    pub idle_timeout: Duration,
    pub poll_interval: Duration,
}

impl RecorderLimits {
    pub fn from_secs(max_duration_sec: u64, idle_timeout_sec: u64) -> Self {
        Self {
            max_duration: Duration::from_secs(max_duration_sec),
            idle_timeout: Duration::from_secs(idle_timeout_sec),
            poll_interval: DEFAULT_WATCHDOG_INTERVAL,
        }
    }

    /// No limits at all; the session runs until stopped
    pub fn unlimited() -> Self {
        Self::from_secs(0, 0)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for RecorderLimits {
    fn default() -> Self {
        Self::from_secs(120, 10)
    }
}

enum Action {
    Stop,
    Pause,
}

/// Poll until the session of `generation` is gone or the max duration hits.
pub(crate) fn run(shared: Arc<Shared>, limits: RecorderLimits, generation: u64) {
    debug!("Watchdog started for session generation {}", generation);

    loop {
        thread::sleep(limits.poll_interval);

        let action = {
            let state = shared.lock_state();
            if state.generation != generation || !state.status.is_active() {
                break;
            }

            let now = Instant::now();
            let elapsed = state
                .start_instant
                .map(|start| now.duration_since(start))
                .unwrap_or_default();
            let idle_for = state.idle_since().map(|since| now.duration_since(since));

            if !limits.max_duration.is_zero() && elapsed >= limits.max_duration {
                Some(Action::Stop)
            } else if state.status == SessionStatus::Running && !limits.idle_timeout.is_zero() {
                match idle_for {
                    Some(idle_for) if idle_for >= limits.idle_timeout => Some(Action::Pause),
                    _ => None,
                }
            } else {
                None
            }
        };

        // Transitions take the lock themselves
        match action {
            Some(Action::Stop) => {
                info!("Max duration reached; stopping");
                shared.stop(Some(generation));
                break;
            }
            Some(Action::Pause) => {
                info!("Idle timeout reached; auto-pausing");
                shared.pause(Some(generation));
            }
            None => {}
        }
    }

    debug!("Watchdog exiting for session generation {}", generation);
}
