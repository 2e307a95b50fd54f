//! Run log: the operator-facing record of a package execution.
//!
//! A [`RunLog`] is created once per run and passed to everything that
//! reports progress. It writes to two sinks:
//!
//! - a persistent log file (created for levels `Default` and `File`) with a
//!   UTC timestamp at the start of every line
//! - the console
//!
//! A sink receives a message when its accepted level is at or above the
//! run's [`LogLevel`]: the file sink accepts up to `File`, the console sink
//! up to `Console`, so `Silent` writes nothing.
//!
//! Diagnostics for developers go through the `log` facade instead.

use crate::error::{Error, Result};
use crate::types::LogLevel;
use chrono::{Timelike, Utc};
use colored::Colorize;
use manifest::MessageKind;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Width of title frames; rules are one character shorter.
const LINE_LENGTH: usize = 80;

/// Level accepted by the file sink.
const FILE_ACCEPTS: LogLevel = LogLevel::File;

/// Level accepted by the console sink.
const CONSOLE_ACCEPTS: LogLevel = LogLevel::Console;

/// Appends to the run log file, reopening it for every write so the worker
/// can append to the same file between phases.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    line_start: bool,
}

impl FileSink {
    /// Create the log file if it does not exist yet.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        if !path.exists() {
            fs::write(&path, "\n").map_err(|e| Error::io(&path, e))?;
        }
        Ok(Self {
            path,
            line_start: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, text: &str, newline: bool) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        if self.line_start {
            write!(file, "{}\t", timestamp())?;
        }
        file.write_all(text.as_bytes())?;
        if newline {
            writeln!(file)?;
        }
        self.line_start = newline;
        Ok(())
    }
}

/// Writes to the terminal or to a captured buffer.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
}

impl ConsoleSink {
    /// Console sink writing to stdout.
    pub fn stdout() -> Self {
        Self {
            out: Box::new(io::stdout()),
        }
    }

    /// Console sink writing to any writer.
    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// Console sink writing into a buffer that can be read back.
    pub fn captured() -> (Self, CapturedOutput) {
        let buffer = CapturedOutput::default();
        (Self::with_writer(buffer.clone()), buffer)
    }

    fn write(&mut self, text: &str, newline: bool) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        if newline {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

/// Shared in-memory console output.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        let buffer = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Level-gated, two-sink run log.
#[derive(Debug)]
pub struct RunLog {
    level: LogLevel,
    file: Option<FileSink>,
    console: ConsoleSink,
    exceptions: u32,
}

impl RunLog {
    /// Create the run log for a package.
    ///
    /// The log file is only created for levels `Default` and `File`. Its path
    /// is `log_file` when given, otherwise
    /// `<log_dir>/<package_name>_<yyyyMMdd-HHmmss>.log`.
    pub fn create(
        level: LogLevel,
        log_file: Option<&Path>,
        log_dir: &Path,
        package_name: &str,
        console: ConsoleSink,
    ) -> Result<Self> {
        let file = if level <= FILE_ACCEPTS {
            let path = match log_file {
                Some(path) => path.to_path_buf(),
                None => log_dir.join(default_file_name(package_name)),
            };
            log::debug!("Run log file: {}", path.display());
            Some(FileSink::create(path)?)
        } else {
            None
        };

        Ok(Self::new(level, file, console))
    }

    /// Assemble a run log from already created sinks.
    pub fn new(level: LogLevel, file: Option<FileSink>, console: ConsoleSink) -> Self {
        Self {
            level,
            file,
            console,
            exceptions: 0,
        }
    }

    /// Run log that only writes to `console`.
    pub fn console_only(level: LogLevel, console: ConsoleSink) -> Self {
        Self::new(level, None, console)
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Path of the log file, if one was created.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_ref().map(FileSink::path)
    }

    /// Number of errors written with [`RunLog::error`].
    pub fn exceptions(&self) -> u32 {
        self.exceptions
    }

    /// Write a centered title between two rules.
    pub fn title(&mut self, title: &str) {
        let rule = "=".repeat(LINE_LENGTH - 1);
        self.line(&rule);
        self.line(&center(title));
        self.line(&rule);
    }

    /// Write text without ending the line.
    pub fn write(&mut self, text: &str) {
        self.emit(text, false);
    }

    /// Write a full line.
    pub fn line(&mut self, text: &str) {
        self.emit(text, true);
    }

    /// Write an error together with its chain of sources.
    pub fn error(&mut self, error: &dyn std::error::Error) {
        self.exceptions += 1;

        let mut text = error.to_string();
        let mut source = error.source();
        while let Some(inner) = source {
            text.push_str("\n---- Inner error:\n");
            text.push_str(&inner.to_string());
            source = inner.source();
        }
        self.line(&text);
    }

    /// Write a manifest outcome message, highlighted on the console.
    pub fn message(&mut self, kind: MessageKind, text: &str) {
        if self.accepts(FILE_ACCEPTS) {
            if let Some(file) = self.file.as_mut() {
                if let Err(e) = file.write(text, false) {
                    log::warn!("Failed to write run log {}: {e}", file.path().display());
                }
            }
        }
        if self.accepts(CONSOLE_ACCEPTS) {
            let highlighted = match kind {
                MessageKind::Success => text.white().on_green(),
                MessageKind::Warning => text.yellow().on_black(),
                MessageKind::Error => text.yellow().on_red(),
            };
            if let Err(e) = self.console.write(&highlighted.to_string(), false) {
                log::warn!("Failed to write to console: {e}");
            }
        }
        self.line("");
    }

    /// Write to the console regardless of the level.
    pub fn notice(&mut self, text: &str) {
        if let Err(e) = self.console.write(text, true) {
            log::warn!("Failed to write to console: {e}");
        }
    }

    fn accepts(&self, sink_level: LogLevel) -> bool {
        sink_level >= self.level
    }

    fn emit(&mut self, text: &str, newline: bool) {
        if self.accepts(FILE_ACCEPTS) {
            if let Some(file) = self.file.as_mut() {
                if let Err(e) = file.write(text, newline) {
                    log::warn!("Failed to write run log {}: {e}", file.path().display());
                }
            }
        }
        if self.accepts(CONSOLE_ACCEPTS) {
            if let Err(e) = self.console.write(text, newline) {
                log::warn!("Failed to write to console: {e}");
            }
        }
    }
}

/// `<package>_<yyyyMMdd-HHmmss>.log` in UTC.
pub fn default_file_name(package_name: &str) -> String {
    format!("{package_name}{}.log", Utc::now().format("_%Y%m%d-%H%M%S"))
}

/// `HH:MM:SS.ffff` in UTC.
fn timestamp() -> String {
    let now = Utc::now();
    format!(
        "{}.{:04}",
        now.format("%H:%M:%S"),
        now.nanosecond() % 1_000_000_000 / 100_000
    )
}

fn center(text: &str) -> String {
    let len = text.chars().count();
    if len >= LINE_LENGTH - 1 {
        return text.to_string();
    }
    format!("{}{text}", " ".repeat((LINE_LENGTH - len) / 2))
}
