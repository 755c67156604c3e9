//! Structured logging setup.

use crate::error::{Error, Result};
use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn open_log_file(path: &str) -> Result<Mutex<File>> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(Mutex::new)
        .map_err(|err| Error::Logging(format!("Failed to open log file: {err}")))
}

fn map_init_err<E: std::fmt::Display>(err: E) -> Error {
    Error::Logging(format!("Failed to initialize logging: {err}"))
}

fn filter_for(level: &str) -> Result<EnvFilter> {
    if level.eq_ignore_ascii_case("off") {
        Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()))
    } else {
        EnvFilter::try_new(level).map_err(|err| Error::Logging(format!("Invalid log filter: {err}")))
    }
}

/// Install the global tracing subscriber.
///
/// When `level` is `None`, this reads `LPBIND_TRACE` if set and otherwise
/// uses `off`. `LPBIND_LOG_FORMAT` picks `pretty` (default) or `json` output
/// on stderr; `LPBIND_LOG_FILE` adds a second, uncoloured copy appended to
/// that file. Returns `Ok(true)` when logging is initialized and `Ok(false)`
/// if a subscriber is already configured.
pub fn init_logging(level: Option<&str>) -> Result<bool> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let level_value = level
        .map(str::to_string)
        .or_else(|| env::var("LPBIND_TRACE").ok())
        .unwrap_or_else(|| "off".to_string());
    let filter = filter_for(&level_value)?;

    let format = env::var("LPBIND_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let log_file = env::var("LPBIND_LOG_FILE").ok();
    let use_json = format.eq_ignore_ascii_case("json");

    if !use_json && !format.eq_ignore_ascii_case("pretty") {
        return Err(Error::Logging(
            "Invalid LPBIND_LOG_FORMAT (expected 'json' or 'pretty')".to_string(),
        ));
    }

    if use_json {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .json();
        let base = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer);
        if let Some(path) = log_file {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(open_log_file(&path)?)
                .with_ansi(false)
                .json();
            base.with(file_layer).try_init().map_err(map_init_err)?;
        } else {
            base.try_init().map_err(map_init_err)?;
        }
    } else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .pretty();
        let base = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer);
        if let Some(path) = log_file {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(open_log_file(&path)?)
                .with_ansi(false)
                .pretty();
            base.with(file_layer).try_init().map_err(map_init_err)?;
        } else {
            base.try_init().map_err(map_init_err)?;
        }
    }

    Ok(true)
}
