//! OS-level capture source backed by `device_query`
//!
//! `device_query` exposes the set of currently held keys, so the listener
//! polls it on a dedicated thread and turns set differences into press and
//! release callbacks.

use super::{key_code, CaptureError, CaptureSource, KeySink};
use device_query::{DeviceQuery, DeviceState, Keycode};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default interval between keyboard state polls (~500 Hz)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Keyboard listener that polls for key state changes on its own thread
pub struct DeviceQueryListener {
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DeviceQueryListener {
    /// Create a new keyboard listener
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for DeviceQueryListener {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for DeviceQueryListener {
    fn attach(&mut self, sink: Arc<dyn KeySink>) -> Result<(), CaptureError> {
        if self.is_attached() {
            return Err(CaptureError::AlreadyAttached);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let interval = self.poll_interval;
        let (ready_tx, ready_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("kdyn-capture".to_string())
            .spawn(move || {
                // DeviceState holds platform handles that must stay on this thread
                let device_state = match DeviceState::checked_new() {
                    Some(state) => {
                        let _ = ready_tx.send(Ok(()));
                        state
                    }
                    None => {
                        let _ = ready_tx.send(Err(CaptureError::PermissionDenied(
                            "grant input monitoring / accessibility access, or run inside an X11 session"
                                .to_string(),
                        )));
                        return;
                    }
                };
                poll_loop(&device_state, sink.as_ref(), &running, interval);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(CaptureError::Unavailable(e.to_string()));
            }
        };

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(CaptureError::Unavailable(
                "capture thread exited during startup".to_string(),
            ))
        });

        match ready {
            Ok(()) => {
                info!("Keyboard listener attached (poll interval {:?})", interval);
                self.thread_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                warn!("Keyboard listener failed to attach: {}", e);
                Err(e)
            }
        }
    }

    fn detach(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            // The thread exits on its next poll once `running` is cleared
            let _ = handle.join();
            info!("Keyboard listener detached");
        }
    }

    fn is_attached(&self) -> bool {
        self.thread_handle.is_some()
    }
}

impl Drop for DeviceQueryListener {
    fn drop(&mut self) {
        self.detach();
    }
}

fn poll_loop(
    device_state: &DeviceState,
    sink: &dyn KeySink,
    running: &AtomicBool,
    interval: Duration,
) {
    let mut last_keys: Vec<Keycode> = Vec::new();

    while running.load(Ordering::SeqCst) {
        let current_keys = device_state.get_keys();

        // Check for new key presses
        for key in &current_keys {
            if !last_keys.contains(key) {
                match key_code(key) {
                    Some(code) => sink.on_press(code),
                    None => debug!("Ignoring press of unmapped key"),
                }
            }
        }

        // Check for key releases
        for key in &last_keys {
            if !current_keys.contains(key) {
                if let Some(code) = key_code(key) {
                    sink.on_release(code);
                }
            }
        }

        last_keys = current_keys;
        thread::sleep(interval);
    }
}
