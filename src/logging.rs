//! Logging setup
//!
//! Command-line and server modes log to stderr. The TUI owns the terminal,
//! so it logs to a file instead.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::{prelude::*, registry};

pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

const LOG_FILE_NAME: &str = "dockmon.log";

/// Directory used for TUI logs: the user cache dir, or ./logs
pub fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("dockmon"))
        .unwrap_or_else(|| Path::new("logs").to_path_buf())
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the program so buffered file output is flushed.
pub fn init(target: LogTarget, default_level: LevelFilter) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match target {
        LogTarget::Stderr => {
            let fmt_layer = layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(env_filter);
            // A second init (tests, embedding) keeps the first subscriber
            let _ = registry().with(fmt_layer).try_init();
            None
        }
        LogTarget::File(dir) => {
            let file_appender = rolling::daily(dir, LOG_FILE_NAME);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter);
            let _ = registry().with(file_layer).try_init();
            Some(guard)
        }
    }
}
