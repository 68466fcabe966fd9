//! Terminal User Interface components

mod app;
pub mod settings;
pub mod theme;
mod widgets;

pub use app::{new_session_id, App, AppState, AppView, SPARKLINE_LEN};
pub use settings::SettingsField;
pub use theme::ThemeColors;
pub use widgets::*;
