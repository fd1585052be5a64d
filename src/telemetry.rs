//! Tracing subscriber setup.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSection;

const LOG_FILE_PREFIX: &str = "defectdesk.log";

/// Filter used when `RUST_LOG` is unset: the configured level, raised to
/// `debug` for this crate when `verbose`.
pub fn default_filter(logging: &LoggingSection, verbose: bool) -> String {
    if verbose {
        format!("{},defectdesk=debug", logging.level)
    } else {
        logging.level.clone()
    }
}

/// Install the global subscriber. Logs go to stderr; with
/// `logging.directory` set they are also written to a daily file. The
/// returned guard must live until exit so buffered lines are flushed.
pub fn init_tracing(logging: &LoggingSection, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(logging, verbose)))
        .context("Invalid log filter")?;

    let (file_writer, guard) = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match (logging.json, file_writer) {
        (true, Some(file)) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr.and(file)))
            .try_init(),
        (true, None) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        (false, Some(file)) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
            .try_init(),
        (false, None) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
