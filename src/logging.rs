// SPDX-License-Identifier: GPL-3.0-only

//! Logging setup
//!
//! `RUST_LOG` always wins over the defaults chosen here. The terminal
//! viewer owns the screen, so it logs to a daily-rolling file instead of
//! stderr.

use crate::constants::{self, driver::LOG_RETENTION_DAYS};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log to stderr
pub fn init_stderr(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Directory for log files: `<data_dir>/object-announcer/logs`
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(constants::APP_NAME)
        .join("logs")
}

/// Log to a daily-rolling file in `dir`
///
/// The returned guard flushes the background writer; keep it alive until
/// the program exits. Falls back to stderr if the directory is unusable.
pub fn init_file(dir: &Path, default_level: &str) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        init_stderr(default_level);
        tracing::warn!(dir = %dir.display(), error = %e, "Cannot create log directory, logging to stderr");
        return None;
    }

    cleanup_old_logs(dir, Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60));

    let appender = RollingFileAppender::new(Rotation::DAILY, dir, "object-announcer.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true)
        .init();

    Some(guard)
}

/// Remove log files older than `retention`
fn cleanup_old_logs(dir: &Path, retention: Duration) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let now = SystemTime::now();

    for entry in entries.flatten() {
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("object-announcer.log"));
        if !is_log {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if expired {
            let _ = std::fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_only_touches_expired_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("object-announcer.log.2020-01-01");
        let other = dir.path().join("notes.txt");
        std::fs::write(&log, "old").unwrap();
        std::fs::write(&other, "keep").unwrap();

        // Nothing is older than a day yet
        cleanup_old_logs(dir.path(), Duration::from_secs(24 * 60 * 60));
        assert!(log.exists());

        std::thread::sleep(Duration::from_millis(20));
        cleanup_old_logs(dir.path(), Duration::from_millis(1));
        assert!(!log.exists());
        assert!(other.exists());
    }
}
