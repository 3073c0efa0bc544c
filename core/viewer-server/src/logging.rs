//! Tracing subscriber setup for the server binary.
//!
//! Console output always; a daily-rolling file under `logging.directory`
//! when configured. The returned guard must stay alive for the file writer
//! to flush.

use std::env;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use viewer_core::config::DEBUG_LOG_ENV;
use viewer_core::LoggingConfig;

const LOG_FILE_PREFIX: &str = "claude-log-viewer";

/// Keeps the non-blocking file writer alive.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
}

pub fn init(config: &LoggingConfig) -> LoggingGuard {
    let debug_forced = env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(&config.level, rust_log.as_deref(), debug_forced);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut file_error = None;
    let (file_layer, guard) = match config.directory.as_deref().map(file_writer) {
        Some(Ok((writer, guard))) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)),
            Some(guard),
        ),
        Some(Err(err)) => {
            file_error = Some(err);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some(err) = file_error {
        tracing::warn!(error = %err, "File logging disabled");
    }
    tracing::debug!(filter = %directive, "Logging initialized");

    LoggingGuard { _guard: guard }
}

/// Debug override first, then `RUST_LOG`, then the configured level.
fn filter_directive(level: &str, rust_log: Option<&str>, debug_forced: bool) -> String {
    if debug_forced {
        return "debug".to_string();
    }
    match rust_log.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_string(),
        None => level.to_string(),
    }
}

fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard), String> {
    fs_err::create_dir_all(dir).map_err(|err| err.to_string())?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .map_err(|err| format!("{}: {}", dir.display(), err))?;
    Ok(tracing_appender::non_blocking(appender))
}
