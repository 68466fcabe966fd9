//! Integration tests for KDyn
//!
//! These drive the public API end to end: a `ManualSource` feeds the
//! recorder, the watchdog enforces limits, and the aggregate flows into the
//! report writer and the TUI application state.

use chrono::{TimeZone, Utc};
use kdyn::analytics::{aggregate, compute_bursts, median, percentile, HoldEvent, LatencyEvent};
use kdyn::config::{Config, Theme};
use kdyn::keyboard::{CaptureSource, KeyCode, KeyEvent, ManualSource};
use kdyn::recorder::{Recorder, RecorderLimits, SessionStatus};
use kdyn::report::ReportWriter;
use kdyn::ui::{App, AppState, AppView, SettingsField};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn recorder_with(source: &ManualSource, limits: RecorderLimits) -> Recorder {
    Recorder::with_source(limits, Box::new(source.clone()))
}

/// Press and release each key in turn
fn type_keys(source: &ManualSource, keys: &[u32]) {
    for &key in keys {
        source.tap(key);
    }
}

fn temp_dir(name: &str) -> PathBuf {
    env::temp_dir().join(format!("kdyn-it-{}-{}", name, std::process::id()))
}

fn test_app(source: &ManualSource, name: &str) -> App {
    let mut config = Config::default();
    config.consent_accepted = true;
    config.session.session_name = name.to_string();
    config.session.max_duration_sec = 0;
    config.session.idle_timeout_sec = 0;
    let recorder = recorder_with(source, RecorderLimits::unlimited());
    App::new(config, recorder, ReportWriter::new(temp_dir(name)))
}

// ---------------------------------------------------------------------------
// Capture pipeline
// ---------------------------------------------------------------------------

#[test]
fn full_pipeline_from_source_to_metrics() {
    let source = ManualSource::new();
    let mut recorder = recorder_with(&source, RecorderLimits::unlimited());
    recorder.start(Utc::now()).unwrap();

    type_keys(&source, &[72, 69, 76, 76, 79]);
    recorder.stop();

    let snapshot = recorder.snapshot().expect("session was started");
    assert_eq!(snapshot.total_events, 5);
    assert_eq!(snapshot.holds.len(), 5);
    // One latency per press after the first event
    assert_eq!(snapshot.latencies.len(), 4);
    assert!(snapshot.holds.iter().all(|h| h.hold_ms >= 0.0));

    let metrics = snapshot.aggregate("pipeline", 700.0);
    assert_eq!(metrics.events, 5);
    assert_eq!(metrics.bursts, 1);
    let codes: Vec<u32> = metrics.per_key.iter().map(|k| k.code.as_u32()).collect();
    assert_eq!(codes, vec![69, 72, 76, 79]);
    assert_eq!(metrics.key_stats(KeyCode(76)).map(|k| k.count), Some(2));
}

#[test]
fn stop_detaches_source_and_ignores_later_events() {
    let source = ManualSource::new();
    let mut recorder = recorder_with(&source, RecorderLimits::unlimited());
    recorder.start(Utc::now()).unwrap();
    source.tap(65);
    recorder.stop();

    assert!(!source.send(KeyEvent::press(KeyCode(66))));
    assert_eq!(recorder.total_events(), 1);
    assert_eq!(recorder.status(), SessionStatus::Stopped);
}

#[test]
fn paused_session_buffers_nothing_until_resumed() {
    let source = ManualSource::new();
    let mut recorder = recorder_with(&source, RecorderLimits::unlimited());
    recorder.start(Utc::now()).unwrap();

    recorder.pause();
    type_keys(&source, &[65, 66, 67]);
    assert_eq!(recorder.total_events(), 0);
    assert!(recorder.holds().is_empty());

    recorder.resume();
    source.tap(65);
    assert_eq!(recorder.total_events(), 1);
    assert_eq!(recorder.holds().len(), 1);
}

#[test]
fn hold_across_pause_boundary_is_dropped() {
    let source = ManualSource::new();
    let mut recorder = recorder_with(&source, RecorderLimits::unlimited());
    recorder.start(Utc::now()).unwrap();

    recorder.pause();
    source.press(65);
    recorder.resume();
    source.release(65);

    assert!(recorder.holds().is_empty());
    assert_eq!(recorder.total_events(), 0);
}

#[test]
fn restart_clears_previous_session() {
    let source = ManualSource::new();
    let mut recorder = recorder_with(&source, RecorderLimits::unlimited());
    recorder.start(Utc::now()).unwrap();
    type_keys(&source, &[65, 66]);
    recorder.stop();

    recorder.start(Utc::now()).unwrap();
    assert_eq!(recorder.status(), SessionStatus::Running);
    assert_eq!(recorder.total_events(), 0);
    assert!(recorder.latencies().is_empty());
    source.tap(67);
    assert_eq!(recorder.total_events(), 1);
    assert_eq!(source.attach_count(), 2);
}

#[test]
fn capture_failure_is_reported_and_recoverable() {
    let source = ManualSource::failing("accessibility permission missing");
    let mut recorder = recorder_with(&source, RecorderLimits::unlimited());

    let err = recorder.start(Utc::now()).unwrap_err();
    assert!(err.to_string().contains("accessibility permission missing"));
    assert_eq!(recorder.status(), SessionStatus::Idle);
    assert!(recorder.snapshot().is_none());

    source.set_failure(None);
    recorder.start(Utc::now()).unwrap();
    assert!(recorder.is_running());
}

#[test]
fn concurrent_sources_never_lose_events() {
    let source = ManualSource::new();
    let mut recorder = recorder_with(&source, RecorderLimits::unlimited());
    recorder.start(Utc::now()).unwrap();

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let source = source.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    source.tap(65 + t);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = recorder.snapshot().unwrap();
    assert_eq!(snapshot.total_events, 200);
    assert_eq!(snapshot.press_timestamps_ms.len(), 200);
    assert_eq!(snapshot.latencies.len(), 199);
    assert_eq!(snapshot.holds.len(), 200);
    assert!(snapshot
        .press_timestamps_ms
        .windows(2)
        .all(|w| w[0] <= w[1]));
}

// ---------------------------------------------------------------------------
// Watchdog
// ---------------------------------------------------------------------------

#[test]
fn watchdog_auto_pauses_after_idle_timeout() {
    let source = ManualSource::new();
    let limits = RecorderLimits {
        max_duration: Duration::ZERO,
        idle_timeout: Duration::from_millis(100),
        poll_interval: Duration::from_millis(5),
    };
    let mut recorder = recorder_with(&source, limits);
    recorder.start(Utc::now()).unwrap();
    source.tap(65);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(recorder.status(), SessionStatus::Paused);

    // Resume restarts the idle timer; many polls pass without a re-pause
    recorder.resume();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(recorder.status(), SessionStatus::Running);

    // Still attached while paused; resume re-enables capture
    source.tap(66);
    assert_eq!(recorder.total_events(), 2);
    recorder.stop();
}

#[test]
fn watchdog_leaves_untouched_session_running() {
    let source = ManualSource::new();
    let limits = RecorderLimits {
        max_duration: Duration::ZERO,
        idle_timeout: Duration::from_millis(40),
        poll_interval: Duration::from_millis(5),
    };
    let mut recorder = recorder_with(&source, limits);
    recorder.start(Utc::now()).unwrap();

    thread::sleep(Duration::from_millis(200));
    assert_eq!(recorder.status(), SessionStatus::Running);
    recorder.stop();
}

#[test]
fn watchdog_stops_at_max_duration() {
    let source = ManualSource::new();
    let limits = RecorderLimits {
        max_duration: Duration::from_millis(50),
        idle_timeout: Duration::ZERO,
        poll_interval: Duration::from_millis(5),
    };
    let mut recorder = recorder_with(&source, limits);
    recorder.start(Utc::now()).unwrap();

    thread::sleep(Duration::from_millis(300));
    assert_eq!(recorder.status(), SessionStatus::Stopped);
    assert!(!source.is_attached());
    assert!(!source.tap(65));
    assert_eq!(recorder.total_events(), 0);
}

// ---------------------------------------------------------------------------
// Analytics properties
// ---------------------------------------------------------------------------

#[test]
fn percentile_extremes_are_min_and_max() {
    let data = [12.0, 3.5, 99.0, 42.0, 7.25];
    assert_eq!(percentile(&data, 0.0), 3.5);
    assert_eq!(percentile(&data, 1.0), 99.0);
    assert_eq!(median(&data), 12.0);
}

#[test]
fn burst_edge_cases() {
    assert_eq!(compute_bursts(&[], 700.0), (0, 0.0));
    assert_eq!(compute_bursts(&[1234.0], 700.0), (1, 1.0));
    assert_eq!(
        compute_bursts(&[0.0, 100.0, 200.0, 800.0, 1000.0, 1600.0], 700.0),
        (1, 6.0)
    );
    assert_eq!(
        compute_bursts(&[0.0, 100.0, 200.0, 900.0, 1000.0, 1100.0], 700.0),
        (2, 3.0)
    );
}

// ---------------------------------------------------------------------------
// Reports and config
// ---------------------------------------------------------------------------

#[test]
fn report_schema_and_html() {
    let holds = [HoldEvent {
        code: KeyCode(65),
        hold_ms: 100.0,
    }];
    let lats = [LatencyEvent { latency_ms: 50.0 }];
    let started = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let metrics = aggregate("sess123", started, 12, 2, &holds, &lats, &[0.0, 500.0]);

    let dir = temp_dir("reports");
    let writer = ReportWriter::new(&dir);
    let json_path = writer.write_json(&metrics).unwrap();
    let html_path = writer.write_html(&metrics).unwrap();

    let data: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    for key in [
        "session_id",
        "started_at",
        "duration_secs",
        "events",
        "holds_count",
        "latency_count",
        "median_hold_ms",
        "median_latency_ms",
        "p95_latency_ms",
        "bursts",
        "avg_burst_len",
        "per_key",
    ] {
        assert!(data.get(key).is_some(), "missing {key}");
    }
    assert!(fs::read_to_string(&html_path)
        .unwrap()
        .to_lowercase()
        .contains("<html"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn config_roundtrip_feeds_recorder_limits() {
    let path = temp_dir("config").with_extension("toml");
    let mut config = Config::default();
    config.session.max_duration_sec = 30;
    config.session.idle_timeout_sec = 0;
    config.ui.theme = Theme::Light;
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    let limits = loaded.recorder_limits();
    assert_eq!(limits.max_duration, Duration::from_secs(30));
    assert!(limits.idle_timeout.is_zero());
    assert_eq!(loaded.ui.theme, Theme::Light);

    let _ = fs::remove_file(&path);
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[test]
fn app_session_lifecycle() {
    let source = ManualSource::new();
    let mut app = test_app(&source, "lifecycle");
    assert_eq!(app.state, AppState::Active);

    app.start_session();
    let id = app.session_id.clone().expect("session id assigned");
    assert!(id.starts_with("lifecycle-"));

    type_keys(&source, &[65, 83, 68, 70]);
    app.refresh();
    assert_eq!(app.metrics.as_ref().map(|m| m.events), Some(4));

    app.toggle_pause();
    assert_eq!(app.recorder.status(), SessionStatus::Paused);
    source.tap(65);
    app.refresh();
    assert_eq!(app.metrics.as_ref().map(|m| m.events), Some(4));

    app.toggle_pause();
    app.stop_session();
    assert_eq!(app.recorder.status(), SessionStatus::Stopped);

    let (json, html) = app.export_reports().unwrap().expect("reports written");
    assert!(json.exists());
    assert!(html.exists());

    app.reset_session();
    assert!(app.session_id.is_none());
    assert!(app.export_reports().unwrap().is_none());

    let _ = fs::remove_dir_all(temp_dir("lifecycle"));
}

#[test]
fn app_reports_watchdog_stop() {
    let source = ManualSource::new();
    let mut app = test_app(&source, "watchdog");
    app.config.session.max_duration_sec = 1;
    app.start_session();

    thread::sleep(Duration::from_millis(1300));
    app.refresh();
    assert_eq!(app.recorder.status(), SessionStatus::Stopped);
    assert_eq!(app.get_status(), Some("Stopped: max duration reached"));
}

#[test]
fn app_views_include_per_key_settings_and_help() {
    let source = ManualSource::new();
    let mut app = test_app(&source, "views");
    let names: Vec<&str> = AppView::all().iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["Dashboard", "Per Key", "Settings", "Help"]);

    app.next_view();
    assert_eq!(app.view, AppView::Keys);
}

#[test]
fn app_settings_edit_persists_and_feeds_next_session() {
    let source = ManualSource::new();
    let dir = temp_dir("settings");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    let mut app = test_app(&source, "settings").with_config_path(path.clone());

    // Max duration is the second field
    app.next_setting();
    assert_eq!(app.selected_setting(), SettingsField::MaxDuration);
    app.activate_setting();
    app.edit_backspace();
    for c in "45".chars() {
        app.edit_input(c);
    }
    app.commit_edit();
    assert!(!app.is_editing());

    let saved = Config::load_from(&path).unwrap();
    assert_eq!(saved.session.max_duration_sec, 45);
    assert_eq!(saved.recorder_limits(), RecorderLimits::from_secs(45, 0));

    app.start_session();
    assert_eq!(app.recorder.limits(), RecorderLimits::from_secs(45, 0));
    app.stop_session();
    let _ = fs::remove_file(path);
}
