//! KDyn - timing-only keystroke dynamics recorder
//!
//! Terminal front-end: consent screen, live KPIs, latency sparkline, per-key
//! table, settings editor and report export.

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn, LevelFilter};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame, Terminal,
};
use std::io::{stdout, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use kdyn::{
    config::{self, Config},
    keyboard::DeviceQueryListener,
    logging,
    recorder::Recorder,
    report::ReportWriter,
    ui::{
        App, AppState, AppView, ConsentPanel, HelpPanel, KpiPanel, LatencySparkline,
        PerKeyPanel, SettingsPanel, StatusBar, TabBar, ThemeColors,
    },
};

fn main() -> Result<()> {
    if let Err(e) = logging::init_logging(LevelFilter::Info) {
        eprintln!("Logging disabled: {}", e);
    }
    info!("KDyn {} starting", env!("CARGO_PKG_VERSION"));

    let (config, config_warning) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => {
            warn!("Using default config: {}", e);
            (Config::default(), Some(format!("Config error, using defaults: {}", e)))
        }
    };

    let reports_dir = ReportWriter::default_dir().unwrap_or_else(|e| {
        warn!("{}; writing reports to ./reports", e);
        "reports".into()
    });

    let recorder = Recorder::with_source(
        config.recorder_limits(),
        Box::new(DeviceQueryListener::new()),
    );
    let mut app = App::new(config, recorder, ReportWriter::new(reports_dir));
    if let Ok(path) = config::config_path() {
        app = app.with_config_path(path);
    }
    if let Some(message) = config_warning {
        app.set_status(message);
    }

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = Arc::clone(&quit);
        ctrlc::set_handler(move || quit.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &quit);

    // Cleanup terminal even if the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.recorder.stop();
    result?;

    println!("\nKDyn session complete.");
    match &app.metrics {
        Some(metrics) => println!("{}", metrics.summary_line()),
        None => println!("No session recorded."),
    }
    info!("KDyn exiting");

    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    quit: &AtomicBool,
) -> Result<()> {
    let tick_rate = app.config.refresh_interval();
    let mut last_refresh = Instant::now();

    loop {
        if last_refresh.elapsed() >= tick_rate {
            app.refresh();
            last_refresh = Instant::now();
        }

        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key.code, key.modifiers);
                }
            }
        }

        if quit.load(Ordering::SeqCst) {
            app.quit();
        }
        if app.state == AppState::Quitting {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: CtKeyCode, modifiers: KeyModifiers) {
    // Raw mode swallows SIGINT
    if code == CtKeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    if app.state == AppState::Consent {
        match code {
            CtKeyCode::Char('a') | CtKeyCode::Enter => app.accept_consent(),
            CtKeyCode::Char('d') | CtKeyCode::Char('q') | CtKeyCode::Esc => app.decline_consent(),
            _ => {}
        }
        return;
    }

    // Typing into a setting swallows every other shortcut
    if app.is_editing() {
        match code {
            CtKeyCode::Enter => app.commit_edit(),
            CtKeyCode::Esc => app.cancel_edit(),
            CtKeyCode::Backspace => app.edit_backspace(),
            CtKeyCode::Char(c) => app.edit_input(c),
            _ => {}
        }
        return;
    }

    if app.view == AppView::Settings {
        match code {
            CtKeyCode::Up | CtKeyCode::Char('k') => return app.prev_setting(),
            CtKeyCode::Down | CtKeyCode::Char('j') => return app.next_setting(),
            CtKeyCode::Enter => return app.activate_setting(),
            _ => {}
        }
    }

    match code {
        CtKeyCode::Char('q') | CtKeyCode::Esc => app.quit(),
        CtKeyCode::BackTab => app.prev_view(),
        CtKeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => app.prev_view(),
        CtKeyCode::Tab => app.next_view(),
        CtKeyCode::Char('?') => app.view = AppView::Help,
        CtKeyCode::Char('s') => app.start_session(),
        CtKeyCode::Char(' ') => app.toggle_pause(),
        CtKeyCode::Char('x') => app.stop_session(),
        CtKeyCode::Char('r') => app.reset_session(),
        CtKeyCode::Char('t') => app.cycle_theme(),
        CtKeyCode::Char('e') => {
            // Failures are already reported in the status bar
            let _ = app.export_reports();
        }
        _ => {}
    }
}

fn draw(frame: &mut Frame, app: &App) {
    let colors = ThemeColors::from_theme(app.config.ui.theme);
    let size = frame.area();

    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg).fg(colors.fg)),
        size,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Min(8),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    let tab_names: Vec<&str> = AppView::all().iter().map(|v| v.name()).collect();
    frame.render_widget(TabBar::new(&tab_names, app.view.index(), colors), chunks[0]);

    if app.state == AppState::Consent {
        frame.render_widget(ConsentPanel::new(colors), chunks[1]);
    } else {
        match app.view {
            AppView::Dashboard => {
                let rows = app.dashboard_rows();
                let parts = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(rows.len() as u16 + 2),
                        Constraint::Min(4),
                    ])
                    .split(chunks[1]);
                frame.render_widget(KpiPanel::new(&rows, colors), parts[0]);
                frame.render_widget(
                    LatencySparkline::new(app.latency_sample(), colors),
                    parts[1],
                );
            }
            AppView::Keys => {
                let keys = app.metrics.as_ref().map(|m| m.per_key.as_slice()).unwrap_or(&[]);
                frame.render_widget(PerKeyPanel::new(keys, colors), chunks[1]);
            }
            AppView::Settings => {
                let rows = app.settings_rows();
                let panel = SettingsPanel::new(&rows, app.settings_index(), colors)
                    .editing(app.edit_buffer());
                frame.render_widget(panel, chunks[1]);
            }
            AppView::Help => frame.render_widget(HelpPanel::new(colors), chunks[1]),
        }
    }

    let status = app.recorder.status();
    let elapsed = app.elapsed_formatted();
    let events = app.metrics.as_ref().map(|m| m.events).unwrap_or(0);
    let status_bar = StatusBar::new(status.name(), app.view.name(), &elapsed, events, colors)
        .message(app.get_status());
    frame.render_widget(status_bar, chunks[2]);
}
