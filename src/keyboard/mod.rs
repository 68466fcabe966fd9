//! Keyboard capture: key codes, capture sources and the sink they feed

pub mod keymap;
mod listener;
mod manual;
mod source;

pub use keymap::{key_code, KeyCode};
pub use listener::{DeviceQueryListener, DEFAULT_POLL_INTERVAL};
pub use manual::ManualSource;
pub use source::{CaptureError, CaptureSource, KeyEvent, KeyEventType, KeySink};
