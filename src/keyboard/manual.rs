//! In-process capture source
//!
//! Delivers events pushed by the caller instead of the OS hook. Used by the
//! test suite and for replaying synthetic typing.

use super::{CaptureError, CaptureSource, KeyCode, KeyEvent, KeySink};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ManualState {
    sink: Option<Arc<dyn KeySink>>,
    fail_with: Option<String>,
    attach_count: u32,
}

/// A capture source driven by [`ManualSource::press`] / [`ManualSource::release`].
///
/// Cloning yields another handle to the same source, so a test can keep one
/// handle while the recorder owns the other.
#[derive(Clone, Default)]
pub struct ManualSource {
    state: Arc<Mutex<ManualState>>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose `attach` always fails with `PermissionDenied`
    pub fn failing(reason: impl Into<String>) -> Self {
        let source = Self::new();
        source.set_failure(Some(reason.into()));
        source
    }

    pub fn set_failure(&self, reason: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_with = reason;
        }
    }

    /// Number of successful attaches so far
    pub fn attach_count(&self) -> u32 {
        self.state.lock().map(|s| s.attach_count).unwrap_or(0)
    }

    /// Deliver an event. Returns false if the source is detached.
    pub fn send(&self, event: KeyEvent) -> bool {
        // Clone the sink out so the callback runs without holding our lock
        let sink = match self.state.lock() {
            Ok(state) => state.sink.clone(),
            Err(_) => None,
        };
        match sink {
            Some(sink) => {
                sink.dispatch(event);
                true
            }
            None => false,
        }
    }

    pub fn press(&self, code: u32) -> bool {
        self.send(KeyEvent::press(KeyCode(code)))
    }

    pub fn release(&self, code: u32) -> bool {
        self.send(KeyEvent::release(KeyCode(code)))
    }

    /// Press and release a key in sequence
    pub fn tap(&self, code: u32) -> bool {
        self.press(code) && self.release(code)
    }
}

impl CaptureSource for ManualSource {
    fn attach(&mut self, sink: Arc<dyn KeySink>) -> Result<(), CaptureError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CaptureError::Unavailable("manual source poisoned".to_string()))?;
        if let Some(reason) = &state.fail_with {
            return Err(CaptureError::PermissionDenied(reason.clone()));
        }
        if state.sink.is_some() {
            return Err(CaptureError::AlreadyAttached);
        }
        state.sink = Some(sink);
        state.attach_count += 1;
        Ok(())
    }

    fn detach(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.sink = None;
        }
    }

    fn is_attached(&self) -> bool {
        self.state.lock().map(|s| s.sink.is_some()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counter {
        presses: AtomicU32,
        releases: AtomicU32,
    }

    impl KeySink for Counter {
        fn on_press(&self, _code: KeyCode) {
            self.presses.fetch_add(1, Ordering::SeqCst);
        }

        fn on_release(&self, _code: KeyCode) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn delivers_only_while_attached() {
        let counter = Arc::new(Counter::default());
        let handle = ManualSource::new();
        let mut source = handle.clone();

        assert!(!handle.press(65));

        source.attach(counter.clone()).unwrap();
        assert!(handle.tap(65));
        assert_eq!(counter.presses.load(Ordering::SeqCst), 1);
        assert_eq!(counter.releases.load(Ordering::SeqCst), 1);

        source.detach();
        assert!(!handle.press(66));
        assert_eq!(counter.presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_source_refuses_attach() {
        let mut source = ManualSource::failing("no access");
        let result = source.attach(Arc::new(Counter::default()));
        assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
        assert!(!source.is_attached());
        assert_eq!(source.attach_count(), 0);
    }

    #[test]
    fn double_attach_is_rejected() {
        let mut source = ManualSource::new();
        source.attach(Arc::new(Counter::default())).unwrap();
        let second = source.attach(Arc::new(Counter::default()));
        assert!(matches!(second, Err(CaptureError::AlreadyAttached)));
    }
}
