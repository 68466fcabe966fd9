//! Theme color definitions for the UI
//!
//! Dark, light and high-contrast palettes, switchable at runtime with `t`.

use crate::config::Theme;
use ratatui::style::Color;

/// Complete color palette for the UI
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Main background
    pub bg: Color,
    /// Primary foreground text
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Headings, active tab, borders
    pub accent: Color,
    /// Recording status
    pub green: Color,
    /// Paused status, status-bar messages
    pub yellow: Color,
    /// Stopped status, errors
    pub red: Color,
    /// Sparkline bars
    pub spark: Color,
    /// Status/tab bar background
    pub bar_bg: Color,
}

impl ThemeColors {
    /// Create a color palette for the given theme variant
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
            Theme::HighContrast => Self::high_contrast(),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(17, 17, 17),
            fg: Color::Rgb(230, 230, 230),
            dim: Color::Rgb(90, 90, 110),
            accent: Color::Rgb(80, 200, 220),
            green: Color::Rgb(80, 200, 120),
            yellow: Color::Rgb(240, 180, 80),
            red: Color::Rgb(240, 90, 100),
            spark: Color::Rgb(80, 200, 220),
            bar_bg: Color::Rgb(42, 42, 47),
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(245, 245, 248),
            fg: Color::Rgb(30, 30, 40),
            dim: Color::Rgb(130, 130, 150),
            accent: Color::Rgb(0, 130, 160),
            green: Color::Rgb(30, 150, 70),
            yellow: Color::Rgb(180, 120, 0),
            red: Color::Rgb(200, 50, 60),
            spark: Color::Rgb(0, 130, 160),
            bar_bg: Color::Rgb(220, 220, 228),
        }
    }

    /// Pure black and white with saturated status colors
    pub fn high_contrast() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            dim: Color::Gray,
            accent: Color::White,
            green: Color::LightGreen,
            yellow: Color::LightYellow,
            red: Color::LightRed,
            spark: Color::White,
            bar_bg: Color::Black,
        }
    }
}
