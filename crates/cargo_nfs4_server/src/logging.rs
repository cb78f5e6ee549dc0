use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, anyhow, bail};
use tracing::subscriber::set_global_default;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::writer::OptionalWriter;
use tracing_subscriber::layer::SubscriberExt;

static STDOUT_LOGGER: OnceLock<NonBlocking> = OnceLock::new();
static FILE_LOGGER: OnceLock<NonBlocking> = OnceLock::new();

/// Installs the global subscriber. The returned guards flush the
/// non-blocking writers when dropped and must live until exit.
pub fn init_logging(
    log_level: &str,
    log_file: Option<&str>,
    enable_stdout: bool,
) -> anyhow::Result<Vec<WorkerGuard>> {
    let log_level = match log_level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => bail!("invalid log level: {log_level}"),
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);
    let subscriber = tracing_subscriber::Registry::default().with(level_filter);

    let guards = match (enable_stdout, log_file) {
        (false, None) => {
            // No logging
            vec![]
        }
        (true, None) => {
            let stdout_guard = init_stdout_logger()?;
            let subscriber = subscriber.with(layer().with_writer(stdout_logger));
            set_global_default(subscriber).context("failed to set global subscriber")?;
            vec![stdout_guard]
        }
        (false, Some(log_file)) => {
            let file_guard = init_file_logger(log_file)?;
            let subscriber = subscriber.with(layer().with_ansi(false).with_writer(file_logger));
            set_global_default(subscriber).context("failed to set global subscriber")?;
            vec![file_guard]
        }
        (true, Some(log_file)) => {
            let stdout_guard = init_stdout_logger()?;
            let file_guard = init_file_logger(log_file)?;
            let subscriber = subscriber
                .with(layer().with_writer(stdout_logger))
                .with(layer().with_ansi(false).with_writer(file_logger));
            set_global_default(subscriber).context("failed to set global subscriber")?;
            vec![stdout_guard, file_guard]
        }
    };
    Ok(guards)
}

fn stdout_logger() -> OptionalWriter<NonBlocking> {
    STDOUT_LOGGER.get().cloned().into()
}

fn file_logger() -> OptionalWriter<NonBlocking> {
    FILE_LOGGER.get().cloned().into()
}

fn init_stdout_logger() -> anyhow::Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    STDOUT_LOGGER
        .set(non_blocking)
        .map_err(|_| anyhow!("stdout logger already initialized"))?;
    Ok(guard)
}

fn init_file_logger(log_file: &str) -> anyhow::Result<WorkerGuard> {
    let path = Path::new(log_file);
    let file_name = path
        .file_name()
        .with_context(|| format!("log file name is empty: {log_file}"))?;
    let file_appender = tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| Path::new(".")),
        file_name,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    FILE_LOGGER
        .set(non_blocking)
        .map_err(|_| anyhow!("file logger already initialized"))?;
    Ok(guard)
}
