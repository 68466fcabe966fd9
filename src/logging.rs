//! File logging
//!
//! The TUI owns the terminal, so log records go to
//! `<data_dir>/kdyn/logs/kdyn.log`. The log rotates (`kdyn.log.1` ..
//! `kdyn.log.3`) when it would grow past [`MAX_LOG_BYTES`], both at startup and
//! while the process runs. `RUST_LOG` overrides the default level.

use crate::config::APP_DIR_NAME;
use chrono::Utc;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOG_FILE_NAME: &str = "kdyn.log";
pub const MAX_LOG_BYTES: u64 = 1_000_000;
pub const LOG_BACKUPS: usize = 3;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Could not determine data directory")]
    NoDataDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `<data_dir>/kdyn/logs`
pub fn default_log_dir() -> Result<PathBuf, LoggingError> {
    let data_dir = dirs::data_dir().ok_or(LoggingError::NoDataDir)?;
    Ok(data_dir.join(APP_DIR_NAME).join("logs"))
}

fn backup_path(log_file: &Path, index: usize) -> PathBuf {
    let mut name = log_file.as_os_str().to_owned();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// Shift `kdyn.log` to `kdyn.log.1` (and older backups up by one) if it
/// exceeds `max_bytes`. The oldest backup is discarded.
pub fn rotate_if_needed(log_file: &Path, max_bytes: u64, backups: usize) -> Result<bool, LoggingError> {
    let size = match fs::metadata(log_file) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(false),
    };
    if size <= max_bytes {
        return Ok(false);
    }

    shift_backups(log_file, backups)?;
    Ok(true)
}

fn shift_backups(log_file: &Path, backups: usize) -> io::Result<()> {
    if backups == 0 {
        return fs::remove_file(log_file);
    }

    let oldest = backup_path(log_file, backups);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..backups).rev() {
        let from = backup_path(log_file, index);
        if from.exists() {
            fs::rename(&from, backup_path(log_file, index + 1))?;
        }
    }
    fs::rename(log_file, backup_path(log_file, 1))
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Append-only log file that rotates before a write would take it past
/// `max_bytes`. A single record larger than the limit still lands whole.
pub struct RotatingFile {
    path: PathBuf,
    // Closed while the backups shift
    file: Option<File>,
    written: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> Result<Self, LoggingError> {
        let path = path.into();
        rotate_if_needed(&path, max_bytes, backups)?;
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file: Some(file),
            written,
            max_bytes,
            backups,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        shift_backups(&self.path, self.backups)?;
        self.file = Some(open_append(&self.path)?);
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let file = match self.file.take() {
            Some(file) => file,
            None => open_append(&self.path)?,
        };
        let file = self.file.insert(file);
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Install the global logger writing into `dir`. Calling it again is a no-op.
pub fn init_logging_in(dir: &Path, level: LevelFilter) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(dir)?;
    let file = RotatingFile::open(dir.join(LOG_FILE_NAME), MAX_LOG_BYTES, LOG_BACKUPS)?;
    let log_file = file.path().to_path_buf();

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Utc::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            )
        });

    // A logger from an earlier call stays installed
    let _ = builder.try_init();
    Ok(log_file)
}

/// Install the global logger under the platform data directory.
pub fn init_logging(level: LevelFilter) -> Result<PathBuf, LoggingError> {
    let dir = default_log_dir()?;
    init_logging_in(&dir, level)
}
