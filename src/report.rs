//! Session report export (JSON and HTML)

use crate::analytics::Metrics;
use crate::config::APP_DIR_NAME;
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Could not determine data directory")]
    NoDataDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `<session_id>.json` and `<session_id>.html` into a reports directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data_dir>/kdyn/reports`
    pub fn default_dir() -> Result<PathBuf, ReportError> {
        let data_dir = dirs::data_dir().ok_or(ReportError::NoDataDir)?;
        Ok(data_dir.join(APP_DIR_NAME).join("reports"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_json(&self, metrics: &Metrics) -> Result<PathBuf, ReportError> {
        let path = self.path_for(metrics, "json")?;
        fs::write(&path, to_json(metrics)?)?;
        info!("Wrote JSON report to {}", path.display());
        Ok(path)
    }

    pub fn write_html(&self, metrics: &Metrics) -> Result<PathBuf, ReportError> {
        let path = self.path_for(metrics, "html")?;
        fs::write(&path, to_html(metrics))?;
        info!("Wrote HTML report to {}", path.display());
        Ok(path)
    }

    /// Both formats, JSON first
    pub fn write_all(&self, metrics: &Metrics) -> Result<(PathBuf, PathBuf), ReportError> {
        let json = self.write_json(metrics)?;
        let html = self.write_html(metrics)?;
        Ok((json, html))
    }

    fn path_for(&self, metrics: &Metrics, extension: &str) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(&self.dir)?;
        Ok(self
            .dir
            .join(format!("{}.{}", file_stem(&metrics.session_id), extension)))
    }
}

/// Session ids come from user-entered names; keep them inside the reports dir
fn file_stem(session_id: &str) -> String {
    let stem: String = session_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "session".to_string()
    } else {
        stem
    }
}

pub fn to_json(metrics: &Metrics) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(metrics)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Self-contained HTML page with the summary table and per-key breakdown
pub fn to_html(metrics: &Metrics) -> String {
    let id = escape_html(&metrics.session_id);
    let mut html = String::new();

    // Writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>KDyn Report - {id}</title>\n\
         <style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #999;padding:4px 10px;text-align:left}}</style>\n\
         </head>\n<body>\n<h1>KDyn Session {id}</h1>\n"
    );

    let rows = [
        ("Started", metrics.started_at.to_rfc3339()),
        ("Duration (s)", metrics.duration_secs.to_string()),
        ("Events", metrics.events.to_string()),
        ("Holds", metrics.holds_count.to_string()),
        ("Latencies", metrics.latency_count.to_string()),
        ("Median hold (ms)", format!("{:.1}", metrics.median_hold_ms)),
        ("Median latency (ms)", format!("{:.1}", metrics.median_latency_ms)),
        ("P95 latency (ms)", format!("{:.1}", metrics.p95_latency_ms)),
        ("Bursts", metrics.bursts.to_string()),
        ("Avg burst length", format!("{:.2}", metrics.avg_burst_len)),
    ];
    html.push_str("<h2>Summary</h2>\n<table>\n");
    for (label, value) in rows {
        let _ = writeln!(
            html,
            "<tr><th>{}</th><td>{}</td></tr>",
            label,
            escape_html(&value)
        );
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Per key</h2>\n");
    if metrics.per_key.is_empty() {
        html.push_str("<p>No completed key holds.</p>\n");
    } else {
        html.push_str(
            "<table>\n<tr><th>Code</th><th>Count</th><th>Median hold (ms)</th><th>P95 hold (ms)</th></tr>\n",
        );
        for key in &metrics.per_key {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{:.1}</td></tr>",
                key.code, key.count, key.median_hold, key.p95_hold
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str(
        "<p><small>Timing metadata only. No characters or window contents were recorded.</small></p>\n\
         </body>\n</html>\n",
    );
    html
}
