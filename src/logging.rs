//! Diagnostic logging setup.
//!
//! Logs go to stderr by default. With `logging.file` set they are appended to
//! that file instead, so hook output seen by the host stays clean.

use crate::config::{LogLevel, LoggingConfig};
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held until
/// the process exits. A log file that cannot be opened falls back to stderr.
/// Calling this twice keeps the first subscriber.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    if let Some(path) = &config.file {
        match open_log_file(path) {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter(config.level))
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(writer)
                    .try_init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!(
                    "hookguard: warning: cannot open log file {}: {e}",
                    path.display()
                );
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(config.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    None
}

/// Filter at `level`, overridable through `RUST_LOG`.
fn filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level.as_tracing()).into())
        .from_env_lossy()
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut options = OpenOptions::new();
    options.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}
