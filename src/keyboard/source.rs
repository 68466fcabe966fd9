//! Keyboard event types and the capture-source boundary

use super::KeyCode;
use std::sync::Arc;
use thiserror::Error;

/// Type of keyboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventType {
    /// Key was pressed down
    Press,
    /// Key was released
    Release,
}

/// A press or release of a single key. Carries no character content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code
    pub code: KeyCode,
    /// Type of event (press/release)
    pub event_type: KeyEventType,
}

impl KeyEvent {
    pub fn new(code: KeyCode, event_type: KeyEventType) -> Self {
        Self { code, event_type }
    }

    pub fn press(code: KeyCode) -> Self {
        Self::new(code, KeyEventType::Press)
    }

    pub fn release(code: KeyCode) -> Self {
        Self::new(code, KeyEventType::Release)
    }
}

/// Receiver of normalized key events.
///
/// Implementations are invoked from the capture source's delivery thread and
/// must never panic or block for longer than a short critical section.
pub trait KeySink: Send + Sync {
    fn on_press(&self, code: KeyCode);

    fn on_release(&self, code: KeyCode);

    fn dispatch(&self, event: KeyEvent) {
        match event.event_type {
            KeyEventType::Press => self.on_press(event.code),
            KeyEventType::Release => self.on_release(event.code),
        }
    }
}

/// Errors raised while attaching a capture source
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The OS input facility could not be opened
    #[error("keyboard capture unavailable: {0}")]
    Unavailable(String),
    /// The process lacks the permission to observe global input
    #[error("permission denied for keyboard capture: {0}")]
    PermissionDenied(String),
    /// `attach` was called on a source that is already delivering events
    #[error("capture source is already attached")]
    AlreadyAttached,
}

/// A push source of press/release events.
///
/// `attach` starts delivery into `sink`; `detach` must guarantee that no
/// further callbacks reach the sink once it returns.
pub trait CaptureSource: Send {
    fn attach(&mut self, sink: Arc<dyn KeySink>) -> Result<(), CaptureError>;

    fn detach(&mut self);

    fn is_attached(&self) -> bool;
}
