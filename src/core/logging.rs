//! Structured logging
//!
//! Installs the global tracing subscriber: JSON or text output, level from
//! configuration (overridable with `RUST_LOG`), written to a standard stream or to a
//! size-rotated log file through a non-blocking worker.

use crate::core::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the non-blocking writer alive; logs are flushed when dropped
pub struct Logger {
    _guard: WorkerGuard,
}

impl Logger {
    /// Initialize the global subscriber from configuration
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let level = parse_log_level(&config.level)?;

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)));

        let (writer, guard) = match config.output.as_str() {
            "stdout" => tracing_appender::non_blocking(io::stdout()),
            "stderr" => tracing_appender::non_blocking(io::stderr()),
            "file" => {
                let log_file = config
                    .log_file
                    .as_ref()
                    .context("log_file must be specified when output is 'file'")?;
                let rotating = RotatingFile::open(log_file, config.max_file_size, config.max_backups)?;
                tracing_appender::non_blocking(rotating)
            }
            other => anyhow::bail!("Invalid output configuration: {}", other),
        };

        let fmt_layer = match config.format.as_str() {
            "json" => fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_target(true)
                .boxed(),
            "text" => fmt::layer()
                .with_writer(writer)
                .with_ansi(config.output != "file")
                .with_target(true)
                .boxed(),
            other => anyhow::bail!("Invalid format configuration: {}", other),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize tracing subscriber")?;

        tracing::debug!(
            level = %config.level,
            format = %config.format,
            output = %config.output,
            "Logging initialized"
        );

        Ok(Logger { _guard: guard })
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {}", level),
    }
}

/// Log file that rolls over to `<name>.1`, `<name>.2`, ... once it reaches `max_size` bytes
pub struct RotatingFile {
    path: PathBuf,
    max_size: usize,
    max_backups: usize,
    state: Mutex<RotationState>,
}

struct RotationState {
    file: File,
    written: usize,
}

impl RotatingFile {
    pub fn open(path: &Path, max_size: usize, max_backups: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create log directory")?;
        }

        let file = open_append(path).context("Failed to open log file")?;
        let written = file.metadata().map(|m| m.len() as usize).unwrap_or(0);

        Ok(Self {
            path: path.to_path_buf(),
            max_size,
            max_backups,
            state: Mutex::new(RotationState { file, written }),
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&self, state: &mut RotationState) -> io::Result<()> {
        state.file.flush()?;

        // Oldest backup falls off the end
        for index in (1..self.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                std::fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        std::fs::rename(&self.path, self.backup_path(1))?;

        state.file = open_append(&self.path)?;
        state.written = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.written > 0 && state.written + buf.len() > self.max_size {
            self.rotate(&mut state)?;
        }
        let written = state.file.write(buf)?;
        state.written += written;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_rotating_file_rolls_over() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("console.log");
        let mut file = RotatingFile::open(&path, 16, 2).unwrap();

        file.write_all(b"0123456789\n").unwrap();
        file.write_all(b"abcdefghij\n").unwrap();
        file.write_all(b"ABCDEFGHIJ\n").unwrap();
        file.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ABCDEFGHIJ\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("logs/console.log.1")).unwrap(),
            "abcdefghij\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("logs/console.log.2")).unwrap(),
            "0123456789\n"
        );
    }

    #[test]
    fn test_rotating_file_keeps_max_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("console.log");
        let mut file = RotatingFile::open(&path, 4, 1).unwrap();

        for line in ["aaaa", "bbbb", "cccc"] {
            file.write_all(line.as_bytes()).unwrap();
        }

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "cccc");
        assert_eq!(std::fs::read_to_string(dir.path().join("console.log.1")).unwrap(), "bbbb");
        assert!(!dir.path().join("console.log.2").exists());
    }
}
