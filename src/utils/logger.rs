//! Logger utility for application-wide logging
//!
//! A `log::Log` implementation that appends records to a log file and echoes
//! them to the console. When `RUST_LOG` is set the binary hands logging to
//! `env_logger` instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use log::{Log, Record, Metadata, LevelFilter};

/// Custom logger implementation
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    /// Most verbose level this logger emits
    level: LevelFilter,
}

impl Logger {
    /// Creates a logger appending to the given file
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be opened
    pub fn new(log_file: &str) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(Path::new(log_file))?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level: LevelFilter::Info,
        })
    }

    /// Creates a logger without a file; messages passed to `log` are dropped
    pub fn null() -> Self {
        Logger {
            file: Mutex::new(None),
            level: LevelFilter::Info,
        }
    }

    /// Sets the most verbose level emitted through the `log` facade
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    fn file(&self) -> MutexGuard<'_, Option<File>> {
        // A panic mid-write leaves the handle usable
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Logs a message to the log file
    ///
    /// # Arguments
    ///
    /// * `message` - The message to log
    pub fn log(&self, message: &str) -> io::Result<()> {
        if let Some(file) = &mut *self.file() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Initializes the global logger
    ///
    /// # Arguments
    ///
    /// * `log_file` - File receiving log records, if any
    /// * `verbose` - Emit debug records
    pub fn init_global_logger(log_file: Option<&str>, verbose: bool) -> io::Result<()> {
        let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

        if std::env::var_os("RUST_LOG").is_some() {
            if env_logger::Builder::from_default_env().try_init().is_err() {
                eprintln!("Warning: Global logger was already initialized");
            }
            return Ok(());
        }

        let global_logger = match log_file {
            Some(path) => Logger::new(path)?,
            None => Logger::null(),
        }.with_level(level);

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(level);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = Logger::log(self, &message);

            // Console output goes to stderr; stdout carries command results
            eprintln!("{}", message);
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn appends_messages_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qakit.log");
        let path_str = path.to_str().unwrap();

        let logger = Logger::new(path_str).unwrap();
        logger.log("first").unwrap();
        drop(logger);

        let logger = Logger::new(path_str).unwrap();
        logger.log("second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn null_logger_discards() {
        assert!(Logger::null().log("nothing").is_ok());
    }
}
