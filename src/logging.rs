//! Logging setup and the verbosity-gated action logger.
//!
//! Log lines go to a size-rotated file in the results directory and to
//! stderr. File lines look like:
//!
//! ```text
//! [2024-05-01 12:00:00.123] [INFO] loadgen-01/loadtest : view_dashboard is finished successfully
//! ```

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{error, info, warn, Event, Level, Subscriber};
use tracing_subscriber::fmt::{self, format, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::app::AppType;

/// Target used by [`ActionLogger`] events.
pub const LOGGER_NAME: &str = "loadtest";

pub const LOG_FILE_NAME: &str = "loadtest.log";

/// Rotate the log file once it would grow past 5 MiB.
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// Rotated files kept next to the active one (`.1` is the newest).
pub const LOG_BACKUPS: usize = 3;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] io::Error),

    #[error("Global logger already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Logger for action progress whose INFO output follows the app's `verbose` flag.
///
/// WARN and ERROR are always emitted. INFO is emitted when no application is
/// bound, or when the bound application is configured as verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionLogger {
    app_type: Option<AppType>,
    verbose: bool,
}

impl ActionLogger {
    pub fn unbound() -> Self {
        Self {
            app_type: None,
            verbose: false,
        }
    }

    pub fn for_app(app_type: AppType, verbose: bool) -> Self {
        Self {
            app_type: Some(app_type),
            verbose,
        }
    }

    pub fn app_type(&self) -> Option<AppType> {
        self.app_type
    }

    pub fn info_enabled(&self) -> bool {
        self.app_type.is_none() || self.verbose
    }

    pub fn info(&self, message: &str) {
        if self.info_enabled() {
            info!(target: LOGGER_NAME, "{}", message);
        }
    }

    pub fn warn(&self, message: &str) {
        warn!(target: LOGGER_NAME, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(target: LOGGER_NAME, "{}", message);
    }
}

impl Default for ActionLogger {
    fn default() -> Self {
        Self::unbound()
    }
}

/// Render one log line without the trailing newline.
pub fn format_log_line(
    timestamp: &DateTime<Local>,
    level: &Level,
    hostname: &str,
    logger_name: &str,
    message: &str,
) -> String {
    format!(
        "[{}] [{}] {}/{} : {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        hostname,
        logger_name,
        message
    )
}

/// Host name for log lines, `unknown` if it cannot be read.
pub fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Event formatter producing [`format_log_line`] lines.
#[derive(Debug, Clone)]
pub struct LineFormat {
    hostname: String,
}

impl LineFormat {
    pub fn new(hostname: String) -> Self {
        Self { hostname }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let mut message = String::new();
        ctx.field_format()
            .format_fields(format::Writer::new(&mut message), event)?;

        let line = format_log_line(
            &Local::now(),
            meta.level(),
            &self.hostname,
            meta.target(),
            &message,
        );
        writeln!(writer, "{}", line)
    }
}

/// Append-only file writer that rotates by size.
///
/// When a write would bring the file to `max_bytes` or beyond, `name` is renamed to
/// `name.1`, `name.1` to `name.2` and so on; the oldest backup beyond
/// `backups` is deleted.
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: File,
    written: u64,
}

impl RotatingFileWriter {
    pub fn open<P: AsRef<Path>>(path: P, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            max_bytes,
            backups,
            file,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the n-th backup, e.g. `loadtest.log.2`.
    pub fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        match fs::remove_file(self.backup_path(self.backups)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        for n in (1..self.backups).rev() {
            let src = self.backup_path(n);
            if src.exists() {
                fs::rename(&src, self.backup_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 >= self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Install the global subscriber: rotating file in `log_dir` plus stderr.
///
/// The filter defaults to `info` and can be changed with `RUST_LOG`.
/// Returns the path of the active log file.
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<PathBuf, LoggingError> {
    let log_path = log_dir.as_ref().join(LOG_FILE_NAME);
    let writer = RotatingFileWriter::open(&log_path, MAX_LOG_BYTES, LOG_BACKUPS)?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .event_format(LineFormat::new(local_hostname()))
        .with_writer(Mutex::new(writer));

    let console_layer = fmt::layer().compact().with_writer(io::stderr);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(log_path)
}
