// Rust guideline compliant 2026-10-16

//! Tracing subscriber installation.
//!
//! Two layers share one filter: human-readable lines on stdout, and JSON
//! lines appended to `<logs_dir>/invoice-delay-YYYY-MM-DD.log`, dated in the
//! business zone.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use chrono::NaiveDate;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

/// Daily log file name for `date`.
#[must_use]
pub fn log_file_name(date: NaiveDate) -> String {
    format!("invoice-delay-{}.log", date.format("%Y-%m-%d"))
}

/// Filter from `RUST_LOG` when set, otherwise from `fallback`.
///
/// # Errors
///
/// Returns an error when the chosen directive string does not parse.
pub fn env_filter(fallback: &str) -> anyhow::Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(&directives).with_context(|| format!("invalid RUST_LOG {directives:?}"))
        }
        _ => EnvFilter::try_new(fallback).with_context(|| format!("invalid LOG_LEVEL {fallback:?}")),
    }
}

/// Install the global subscriber and return the log file path.
///
/// # Errors
///
/// Returns an error when the log directory or file cannot be opened, the
/// filter does not parse, or a global subscriber is already installed.
pub fn init(level: &str, logs_dir: &Path, today: NaiveDate) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create log directory {}", logs_dir.display()))?;
    let path = logs_dir.join(log_file_name(today));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(env_filter(level)?)
        .with(fmt::layer())
        .with(fmt::layer().json().with_writer(Mutex::new(file)))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_named_by_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        assert_eq!(log_file_name(date), "invoice-delay-2026-03-03.log");
    }

    #[test]
    fn fallback_level_parses() {
        // RUST_LOG may be set by the test harness; either source must parse.
        env_filter("debug").unwrap();
    }
}
