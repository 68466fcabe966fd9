//! KDyn - timing-only keystroke dynamics recorder
//!
//! Captures key press/release timing (never characters), buffers hold and
//! inter-event latency samples while a session runs, and aggregates them into
//! typing-rhythm metrics that can be exported as JSON/HTML reports.

pub mod analytics;
pub mod config;
pub mod keyboard;
pub mod logging;
pub mod notify;
pub mod recorder;
pub mod report;
pub mod ui;

pub use analytics::{aggregate, Metrics};
pub use config::Config;
pub use recorder::{Recorder, RecorderError, RecorderLimits, SessionStatus};
