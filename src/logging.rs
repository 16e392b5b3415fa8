use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AppConfig;

/// Keeps the non-blocking writer alive; drop it last so queued lines flush.
pub struct LoggingRuntime {
    _guard: WorkerGuard,
    pub log_file: PathBuf,
}

/// Console layer plus a dated log file under `config.log_dir`, with files
/// older than the retention window removed at startup.
pub fn init_logging(config: &AppConfig) -> Result<LoggingRuntime> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create log dir: {}", config.log_dir.display()))?;

    let removed = prune_old_logs(&config.log_dir, config.log_retention_days)?;
    if removed > 0 {
        // Logging is not up yet at this point.
        eprintln!("removed {removed} expired log files from {}", config.log_dir.display());
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    let (file_writer, guard, log_file) =
        open_daily_writer(&config.log_dir, Utc::now().date_naive());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    Ok(LoggingRuntime {
        _guard: guard,
        log_file,
    })
}

pub fn prune_old_logs(log_dir: &Path, retention_days: u16) -> Result<usize> {
    prune_old_logs_at(log_dir, retention_days, Utc::now().date_naive())
}

pub fn prune_old_logs_at(log_dir: &Path, retention_days: u16, today: NaiveDate) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = today - ChronoDuration::days(retention_days.max(1) as i64 - 1);
    let entries = std::fs::read_dir(log_dir)
        .with_context(|| format!("failed to read log dir: {}", log_dir.display()))?;

    let mut removed = 0usize;
    for entry in entries {
        let path = entry?.path();
        match log_file_date(&path) {
            Some(date) if path.is_file() && date < cutoff => {
                std::fs::remove_file(&path).with_context(|| {
                    format!("failed to remove expired log file: {}", path.display())
                })?;
                removed += 1;
            }
            _ => {}
        }
    }

    Ok(removed)
}

fn log_file_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_string_lossy();
    NaiveDate::parse_from_str(name.strip_suffix(".log")?, "%Y-%m-%d").ok()
}

fn open_daily_writer(log_dir: &Path, today: NaiveDate) -> (NonBlocking, WorkerGuard, PathBuf) {
    let file_name = format!("{}.log", today.format("%Y-%m-%d"));
    let file_path = log_dir.join(&file_name);
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &file_name));
    (writer, guard, file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn prune_removes_only_dated_files_past_retention() {
        let temp = tempdir().expect("tempdir");
        let log_dir = temp.path();

        std::fs::write(log_dir.join("2026-07-01.log"), "old").expect("write old");
        std::fs::write(log_dir.join("2026-08-04.log"), "keep").expect("write keep");
        std::fs::write(log_dir.join("notes.txt"), "ignore").expect("write misc");

        let removed = prune_old_logs_at(
            log_dir,
            7,
            NaiveDate::from_ymd_opt(2026, 8, 6).expect("date"),
        )
        .expect("prune");

        assert_eq!(removed, 1);
        assert!(!log_dir.join("2026-07-01.log").exists());
        assert!(log_dir.join("2026-08-04.log").exists());
        assert!(log_dir.join("notes.txt").exists());
    }

    #[test]
    fn prune_is_a_noop_for_missing_dir() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("never-created");

        let removed = prune_old_logs(&missing, 7).expect("prune");
        assert_eq!(removed, 0);
    }

    #[test]
    fn daily_writer_flushes_on_guard_drop() {
        let temp = tempdir().expect("tempdir");
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).expect("date");
        let (writer, guard, log_file) = open_daily_writer(temp.path(), today);

        let mut handle = writer.make_writer();
        handle.write_all(b"queued-log-line\n").expect("write log");
        handle.flush().expect("flush");
        drop(handle);
        drop(guard);

        let content = std::fs::read_to_string(log_file).expect("read log file");
        assert!(content.contains("queued-log-line"));
    }
}
