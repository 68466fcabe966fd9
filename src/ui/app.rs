//! Main application state and logic

use crate::analytics::Metrics;
use crate::config::Config;
use crate::notify::Notifier;
use crate::recorder::{Recorder, SessionStatus};
use crate::report::{ReportError, ReportWriter};
use chrono::Utc;
use log::{error, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use super::settings::{FieldKind, SettingsField};
use super::widgets::{KpiRow, Tone};

/// Number of recent latencies shown in the sparkline
pub const SPARKLINE_LEN: usize = 100;

/// `"{name}-{8 hex chars}"`; a blank name becomes `session`
pub fn new_session_id(name: &str) -> String {
    let name = name.trim();
    let name = if name.is_empty() { "session" } else { name };
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", name, &uuid[..8])
}

/// Current view/tab in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Dashboard,
    Keys,
    Settings,
    Help,
}

impl AppView {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Keys => "Per Key",
            Self::Settings => "Settings",
            Self::Help => "Help",
        }
    }

    pub fn all() -> &'static [AppView] {
        &[Self::Dashboard, Self::Keys, Self::Settings, Self::Help]
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Dashboard => 0,
            Self::Keys => 1,
            Self::Settings => 2,
            Self::Help => 3,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Dashboard,
            1 => Self::Keys,
            2 => Self::Settings,
            _ => Self::Help,
        }
    }
}

/// Application running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for the timing-only consent
    Consent,
    Active,
    Quitting,
}

/// Main application
pub struct App {
    /// Current view
    pub view: AppView,
    /// Application state
    pub state: AppState,
    /// Configuration
    pub config: Config,
    /// Capture state machine
    pub recorder: Recorder,
    /// Assigned on first start, cleared on reset
    pub session_id: Option<String>,
    /// Latest live aggregate
    pub metrics: Option<Metrics>,
    latency_sample: Vec<u64>,
    reports: ReportWriter,
    config_path: Option<PathBuf>,
    settings_index: usize,
    /// Text being typed into the selected setting
    settings_edit: Option<String>,
    last_status: SessionStatus,
    /// Last status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
}

impl App {
    pub fn new(config: Config, recorder: Recorder, reports: ReportWriter) -> Self {
        let state = if config.consent_accepted {
            AppState::Active
        } else {
            AppState::Consent
        };
        Self {
            view: AppView::Dashboard,
            state,
            config,
            recorder,
            session_id: None,
            metrics: None,
            latency_sample: Vec::new(),
            reports,
            config_path: None,
            settings_index: 0,
            settings_edit: None,
            last_status: SessionStatus::Idle,
            status_message: None,
            status_time: None,
        }
    }

    /// Persist consent and settings changes to this file
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    fn save_config(&mut self) {
        let Some(path) = self.config_path.clone() else {
            return;
        };
        if let Err(e) = self.config.save_to(&path) {
            warn!("Failed to save config: {}", e);
            self.set_status(format!("Config not saved: {}", e));
        }
    }

    pub fn accept_consent(&mut self) {
        self.config.consent_accepted = true;
        self.state = AppState::Active;
        info!("Timing-only consent accepted");
        self.save_config();
        self.set_status("Consent recorded. Press 's' to start".to_string());
    }

    pub fn decline_consent(&mut self) {
        info!("Consent declined; exiting");
        self.state = AppState::Quitting;
    }

    /// Switch to the next view
    pub fn next_view(&mut self) {
        let current = self.view.index();
        let next = (current + 1) % AppView::all().len();
        self.view = AppView::from_index(next);
    }

    /// Switch to the previous view
    pub fn prev_view(&mut self) {
        let current = self.view.index();
        let prev = if current == 0 {
            AppView::all().len() - 1
        } else {
            current - 1
        };
        self.view = AppView::from_index(prev);
    }

    pub fn start_session(&mut self) {
        if self.state != AppState::Active {
            return;
        }
        if self.recorder.status().is_active() {
            self.set_status("Already recording".to_string());
            return;
        }

        let id = self
            .session_id
            .clone()
            .unwrap_or_else(|| new_session_id(&self.config.session.session_name));
        self.recorder.set_limits(self.config.recorder_limits());

        match self.recorder.start(Utc::now()) {
            Ok(()) => {
                self.set_status(format!("Recording started ({})", id));
                self.session_id = Some(id);
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                self.set_status(format!("Cannot record: {}", e));
            }
        }
        self.last_status = self.recorder.status();
        self.refresh();
    }

    /// Pause if recording, resume if paused
    pub fn toggle_pause(&mut self) {
        if !self.recorder.status().is_active() {
            self.set_status("No active session".to_string());
            return;
        }
        let status = self.recorder.toggle_pause();
        self.last_status = status;
        match status {
            SessionStatus::Paused => self.set_status("Paused".to_string()),
            _ => self.set_status("Resumed".to_string()),
        }
    }

    pub fn stop_session(&mut self) {
        if !self.recorder.status().is_active() {
            return;
        }
        self.recorder.stop();
        self.last_status = self.recorder.status();
        self.refresh();
        self.set_status("Stopped".to_string());
    }

    /// Discard the session, its data and its id
    pub fn reset_session(&mut self) {
        self.recorder.reset(true);
        self.session_id = None;
        self.metrics = None;
        self.latency_sample.clear();
        self.last_status = self.recorder.status();
        self.set_status("Reset".to_string());
    }

    pub fn cycle_theme(&mut self) {
        self.config.ui.theme = self.config.ui.theme.next();
        self.set_status(format!("Theme: {}", self.config.ui.theme.name()));
        self.save_config();
    }

    pub fn selected_setting(&self) -> SettingsField {
        SettingsField::all()[self.settings_index]
    }

    pub fn next_setting(&mut self) {
        if self.settings_edit.is_none() {
            self.settings_index = (self.settings_index + 1) % SettingsField::all().len();
        }
    }

    pub fn prev_setting(&mut self) {
        if self.settings_edit.is_none() {
            let len = SettingsField::all().len();
            self.settings_index = (self.settings_index + len - 1) % len;
        }
    }

    pub fn is_editing(&self) -> bool {
        self.settings_edit.is_some()
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        self.settings_edit.as_deref()
    }

    /// Toggle or cycle the selected setting, or open it for editing
    pub fn activate_setting(&mut self) {
        let field = self.selected_setting();
        match field.kind() {
            FieldKind::Toggle | FieldKind::Choice => {
                field.activate(&mut self.config);
                info!("Setting changed: {}", field.label());
                self.set_status(format!("{}: {}", field.label(), field.display(&self.config)));
                self.save_config();
            }
            FieldKind::Text | FieldKind::Number => {
                self.settings_edit = Some(field.raw_value(&self.config));
            }
        }
    }

    pub fn edit_input(&mut self, c: char) {
        if let Some(buffer) = self.settings_edit.as_mut() {
            if !c.is_control() {
                buffer.push(c);
            }
        }
    }

    pub fn edit_backspace(&mut self) {
        if let Some(buffer) = self.settings_edit.as_mut() {
            buffer.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.settings_edit = None;
    }

    /// Store the edit buffer into the selected setting and save the config.
    /// Invalid input keeps the buffer open.
    pub fn commit_edit(&mut self) {
        let Some(input) = self.settings_edit.take() else {
            return;
        };
        let field = self.selected_setting();
        match field.apply(&mut self.config, &input) {
            Ok(()) => {
                info!("Setting changed: {}", field.label());
                let message = match field {
                    SettingsField::MaxDuration | SettingsField::IdleTimeout => {
                        format!("Saved {} (applies on next start)", field.label())
                    }
                    _ => format!("Saved {}", field.label()),
                };
                self.set_status(message);
                self.save_config();
            }
            Err(e) => {
                self.set_status(e.to_string());
                self.settings_edit = Some(input);
            }
        }
    }

    /// Label/value rows for the settings view
    pub fn settings_rows(&self) -> Vec<KpiRow> {
        SettingsField::all()
            .iter()
            .map(|field| KpiRow::new(field.label(), field.display(&self.config), Tone::Normal))
            .collect()
    }

    pub fn settings_index(&self) -> usize {
        self.settings_index
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.state = AppState::Quitting;
    }

    /// Recompute live metrics and notice watchdog transitions
    pub fn refresh(&mut self) {
        let status = self.recorder.status();
        if status != self.last_status {
            match (self.last_status, status) {
                (SessionStatus::Running, SessionStatus::Paused) => {
                    self.set_status("Auto-paused after idle timeout".to_string())
                }
                (_, SessionStatus::Stopped) => {
                    self.set_status("Stopped: max duration reached".to_string())
                }
                _ => {}
            }
            self.last_status = status;
        }

        let (Some(id), Some(snapshot)) = (&self.session_id, self.recorder.snapshot()) else {
            self.metrics = None;
            self.latency_sample.clear();
            return;
        };

        self.metrics = Some(snapshot.aggregate(id, self.config.session.burst_threshold_ms));

        let skip = snapshot.latencies.len().saturating_sub(SPARKLINE_LEN);
        self.latency_sample = snapshot.latencies[skip..]
            .iter()
            .map(|l| l.latency_ms.round() as u64)
            .collect();
    }

    /// Recent latencies for the sparkline, oldest first
    pub fn latency_sample(&self) -> &[u64] {
        &self.latency_sample
    }

    /// Write JSON and HTML reports and post the summary line.
    ///
    /// Returns `Ok(None)` when no session has been started yet.
    pub fn export_reports(&mut self) -> Result<Option<(PathBuf, PathBuf)>, ReportError> {
        self.refresh();
        let Some(metrics) = self.metrics.clone() else {
            self.set_status("Nothing to export. Start a session first".to_string());
            return Ok(None);
        };

        let (json, html) = match self.reports.write_all(&metrics) {
            Ok(paths) => paths,
            Err(e) => {
                error!("Report export failed: {}", e);
                self.set_status(format!("Export failed: {}", e));
                return Err(e);
            }
        };
        self.set_status(format!("Exported: {} & {}", json.display(), html.display()));

        let notifier = Notifier::from_config(&self.config.notifications);
        if !notifier.is_empty() {
            let summary = metrics.summary_line();
            // Posting blocks for up to the HTTP timeout; keep the UI responsive
            if let Err(e) = thread::Builder::new()
                .name("kdyn-notify".to_string())
                .spawn(move || {
                    notifier.post_summary(&summary);
                })
            {
                warn!("Failed to spawn notifier thread: {}", e);
            }
        }

        Ok(Some((json, html)))
    }

    /// Set a status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(Instant::now());
    }

    /// Get status message if still valid (within 3 seconds)
    pub fn get_status(&self) -> Option<&str> {
        match (&self.status_message, self.status_time) {
            (Some(msg), Some(time)) if time.elapsed().as_secs() < 3 => Some(msg),
            _ => None,
        }
    }

    /// KPI rows for the dashboard
    pub fn dashboard_rows(&self) -> Vec<KpiRow> {
        let status = self.recorder.status();
        let status_tone = match status {
            SessionStatus::Running => Tone::Good,
            SessionStatus::Paused => Tone::Warn,
            SessionStatus::Stopped => Tone::Bad,
            SessionStatus::Idle => Tone::Normal,
        };

        let mut rows = vec![
            KpiRow::new("Status", status.name(), status_tone),
            KpiRow::new(
                "Session",
                self.session_id.as_deref().unwrap_or("-"),
                Tone::Normal,
            ),
            KpiRow::new("Duration", self.elapsed_formatted(), Tone::Normal),
        ];

        match &self.metrics {
            Some(m) => {
                rows.push(KpiRow::new("Events", m.events.to_string(), Tone::Normal));
                rows.push(KpiRow::new("Median hold", format!("{:.1} ms", m.median_hold_ms), Tone::Normal));
                rows.push(KpiRow::new("Median latency", format!("{:.1} ms", m.median_latency_ms), Tone::Normal));
                rows.push(KpiRow::new("P95 latency", format!("{:.1} ms", m.p95_latency_ms), Tone::Normal));
                rows.push(KpiRow::new("Bursts", m.bursts.to_string(), Tone::Normal));
                rows.push(KpiRow::new("Avg burst length", format!("{:.1}", m.avg_burst_len), Tone::Normal));
            }
            None => {
                rows.push(KpiRow::new("Events", "0", Tone::Normal));
                rows.push(KpiRow::new("Median hold", "0.0 ms", Tone::Normal));
                rows.push(KpiRow::new("Median latency", "0.0 ms", Tone::Normal));
                rows.push(KpiRow::new("P95 latency", "0.0 ms", Tone::Normal));
                rows.push(KpiRow::new("Bursts", "0", Tone::Normal));
                rows.push(KpiRow::new("Avg burst length", "0.0", Tone::Normal));
            }
        }

        rows
    }

    /// Get elapsed session time formatted
    pub fn elapsed_formatted(&self) -> String {
        let secs = self.recorder.duration_secs();
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{:02}:{:02}", mins, secs)
    }
}
