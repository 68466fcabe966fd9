//! Custom TUI widgets

use super::theme::ThemeColors;
use crate::analytics::KeyStats;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline, Widget, Wrap},
};

/// Coloring hint for a KPI value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Good,
    Warn,
    Bad,
}

/// One labelled value (dashboard KPI or setting)
#[derive(Debug, Clone, PartialEq)]
pub struct KpiRow {
    pub label: &'static str,
    pub value: String,
    pub tone: Tone,
}

impl KpiRow {
    pub fn new(label: &'static str, value: impl Into<String>, tone: Tone) -> Self {
        Self {
            label,
            value: value.into(),
            tone,
        }
    }
}

/// Widget for the dashboard KPIs
pub struct KpiPanel<'a> {
    rows: &'a [KpiRow],
    colors: ThemeColors,
}

impl<'a> KpiPanel<'a> {
    pub fn new(rows: &'a [KpiRow], colors: ThemeColors) -> Self {
        Self { rows, colors }
    }

    fn tone_color(&self, tone: Tone) -> Color {
        match tone {
            Tone::Normal => self.colors.fg,
            Tone::Good => self.colors.green,
            Tone::Warn => self.colors.yellow,
            Tone::Bad => self.colors.red,
        }
    }
}

impl<'a> Widget for KpiPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Session ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.accent));

        let inner = block.inner(area);
        block.render(area, buf);

        let label_width = self.rows.iter().map(|r| r.label.len()).max().unwrap_or(0) + 2;

        for (row, y) in self.rows.iter().zip(inner.y..inner.y + inner.height) {
            let line = Line::from(vec![
                Span::styled(
                    format!(" {:<width$}", format!("{}:", row.label), width = label_width),
                    Style::default()
                        .fg(self.colors.dim)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    row.value.as_str(),
                    Style::default().fg(self.tone_color(row.tone)),
                ),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}

/// Bar chart of recent inter-event latencies
pub struct LatencySparkline<'a> {
    data: &'a [u64],
    colors: ThemeColors,
}

impl<'a> LatencySparkline<'a> {
    pub fn new(data: &'a [u64], colors: ThemeColors) -> Self {
        Self { data, colors }
    }
}

impl<'a> Widget for LatencySparkline<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let latest = self.data.last().copied().unwrap_or(0);
        let block = Block::default()
            .title(format!(" Latency (ms, recent) - last {} ", latest))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.accent));

        Sparkline::default()
            .block(block)
            .data(self.data)
            .style(Style::default().fg(self.colors.spark))
            .render(area, buf);
    }
}

/// Per-key hold statistics table
pub struct PerKeyPanel<'a> {
    keys: &'a [KeyStats],
    colors: ThemeColors,
}

impl<'a> PerKeyPanel<'a> {
    pub fn new(keys: &'a [KeyStats], colors: ThemeColors) -> Self {
        Self { keys, colors }
    }
}

impl<'a> Widget for PerKeyPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Per Key (hold times) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.accent));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 {
            return;
        }

        if self.keys.is_empty() {
            buf.set_string(
                inner.x + 1,
                inner.y,
                "No completed key holds yet",
                Style::default().fg(self.colors.dim),
            );
            return;
        }

        let header = format!(
            " {:>6}  {:>7}  {:>12}  {:>12}",
            "Code", "Count", "Median (ms)", "P95 (ms)"
        );
        buf.set_string(
            inner.x,
            inner.y,
            &header,
            Style::default()
                .fg(self.colors.yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows = inner.y + 1..inner.y + inner.height;
        for (key, y) in self.keys.iter().zip(rows) {
            let line = format!(
                " {:>6}  {:>7}  {:>12.1}  {:>12.1}",
                key.code, key.count, key.median_hold, key.p95_hold
            );
            buf.set_string(inner.x, y, &line, Style::default().fg(self.colors.fg));
        }
    }
}

/// Settings list with the selected row highlighted
pub struct SettingsPanel<'a> {
    rows: &'a [KpiRow],
    selected: usize,
    editing: Option<&'a str>,
    colors: ThemeColors,
}

impl<'a> SettingsPanel<'a> {
    pub fn new(rows: &'a [KpiRow], selected: usize, colors: ThemeColors) -> Self {
        Self {
            rows,
            selected,
            editing: None,
            colors,
        }
    }

    /// Show this text in place of the selected value
    pub fn editing(mut self, buffer: Option<&'a str>) -> Self {
        self.editing = buffer;
        self
    }
}

impl<'a> Widget for SettingsPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Settings ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.accent));

        let inner = block.inner(area);
        block.render(area, buf);

        let label_width = self.rows.iter().map(|r| r.label.len()).max().unwrap_or(0) + 2;

        for (i, (row, y)) in self.rows.iter().zip(inner.y..inner.y + inner.height).enumerate() {
            let selected = i == self.selected;
            let marker = if selected { ">" } else { " " };
            let label_style = if selected {
                Style::default()
                    .fg(self.colors.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.dim)
            };
            let value = match self.editing {
                Some(buffer) if selected => Span::styled(
                    format!("{}_", buffer),
                    Style::default().fg(self.colors.yellow),
                ),
                _ => Span::styled(row.value.as_str(), Style::default().fg(self.colors.fg)),
            };
            let line = Line::from(vec![
                Span::styled(
                    format!("{} {:<width$}", marker, format!("{}:", row.label), width = label_width),
                    label_style,
                ),
                value,
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }

        let hint_y = inner.y + self.rows.len() as u16 + 1;
        if hint_y < inner.y + inner.height {
            let hint = if self.editing.is_some() {
                "  Enter: save  Esc: cancel"
            } else {
                "  Up/Down: select  Enter: edit or toggle  (limits apply on next start)"
            };
            buf.set_string(inner.x, hint_y, hint, Style::default().fg(self.colors.dim));
        }
    }
}

/// Widget for the help screen
pub struct HelpPanel {
    colors: ThemeColors,
}

impl HelpPanel {
    pub fn new(colors: ThemeColors) -> Self {
        Self { colors }
    }
}

impl Widget for HelpPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Help - KDyn ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.accent));

        let inner = block.inner(area);
        block.render(area, buf);

        let help_text = [
            "",
            " SESSION",
            " -----------",
            " s                : Start recording",
            " Space            : Pause / resume",
            " x                : Stop",
            " r                : Reset (discards data and session id)",
            " e                : Export JSON + HTML reports (and notify)",
            "",
            " NAVIGATION",
            " -----------",
            " Tab / Shift+Tab  : Switch view",
            " t                : Cycle theme",
            "",
            " SETTINGS",
            " -----------",
            " Up / Down        : Select setting",
            " Enter            : Edit, toggle or cycle; Enter again saves",
            " Esc              : Cancel edit",
            " q / Esc          : Quit",
            "",
            " PRIVACY",
            " -----------",
            " Only key codes and timings are recorded.",
            " Characters, window titles and field contents are never captured.",
        ];

        for (line, y) in help_text.iter().zip(inner.y..inner.y + inner.height) {
            let style = if line.contains("---") {
                Style::default().fg(self.colors.dim)
            } else if line.len() > 1 && line[1..].chars().all(|c| c.is_ascii_uppercase()) {
                Style::default()
                    .fg(self.colors.yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            buf.set_string(inner.x, y, line, style);
        }
    }
}

/// First-run consent screen
pub struct ConsentPanel {
    colors: ThemeColors,
}

impl ConsentPanel {
    pub fn new(colors: ThemeColors) -> Self {
        Self { colors }
    }
}

impl Widget for ConsentPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Consent Required ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.yellow));

        let bold = Style::default()
            .fg(self.colors.fg)
            .add_modifier(Modifier::BOLD);
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                " KDyn collects timing metadata only.",
                bold,
            )),
            Line::from(""),
            Line::from(" It records when keys go down and up, identified by key code."),
            Line::from(" It does not capture plaintext characters, window titles or field contents."),
            Line::from(" Raw events stay in memory; only aggregate reports are written to disk."),
            Line::from(""),
            Line::from(" By accepting, you consent to timing-only collection for the current user session."),
            Line::from(""),
            Line::from(vec![
                Span::styled(" [a] ", Style::default().fg(self.colors.green).add_modifier(Modifier::BOLD)),
                Span::raw("Accept    "),
                Span::styled("[d] ", Style::default().fg(self.colors.red).add_modifier(Modifier::BOLD)),
                Span::raw("Decline and quit"),
            ]),
        ];

        Paragraph::new(text)
            .block(block)
            .style(Style::default().fg(self.colors.fg))
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    state: &'a str,
    view: &'a str,
    elapsed: &'a str,
    events: u64,
    message: Option<&'a str>,
    colors: ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(
        state: &'a str,
        view: &'a str,
        elapsed: &'a str,
        events: u64,
        colors: ThemeColors,
    ) -> Self {
        Self {
            state,
            view,
            elapsed,
            events,
            message: None,
            colors,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default().bg(self.colors.bar_bg).fg(self.colors.fg);
        buf.set_style(area, bg_style);

        // Left side: state and view
        let left = format!(" {} | {} ", self.state, self.view);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        // Center: message if any
        if let Some(msg) = self.message {
            let msg_style = bg_style.fg(self.colors.yellow);
            let msg_x = area.x + (area.width / 2).saturating_sub(msg.len() as u16 / 2);
            buf.set_string(msg_x, area.y, msg, msg_style);
        }

        // Right side: elapsed time and events
        let right = format!(" {} | Events: {} ", self.elapsed, self.events);
        let right_x = area.x + area.width.saturating_sub(right.len() as u16);
        buf.set_string(right_x, area.y, &right, bg_style);
    }
}

/// Tab bar widget
pub struct TabBar<'a> {
    tabs: &'a [&'a str],
    selected: usize,
    colors: ThemeColors,
}

impl<'a> TabBar<'a> {
    pub fn new(tabs: &'a [&'a str], selected: usize, colors: ThemeColors) -> Self {
        Self {
            tabs,
            selected,
            colors,
        }
    }
}

impl<'a> Widget for TabBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bar = Style::default().bg(self.colors.bar_bg).fg(self.colors.fg);
        buf.set_style(area, bar);

        let mut x = area.x;
        for (i, tab) in self.tabs.iter().enumerate() {
            let style = if i == self.selected {
                Style::default()
                    .fg(self.colors.bg)
                    .bg(self.colors.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                bar
            };

            let label = format!(" {} ", tab);
            let width = label.len() as u16;
            if x + width > area.x + area.width {
                break;
            }
            buf.set_string(x, area.y, &label, style);
            x += width;

            if i + 1 < self.tabs.len() && x < area.x + area.width {
                buf.set_string(x, area.y, "|", bar.fg(self.colors.dim));
                x += 1;
            }
        }
    }
}
