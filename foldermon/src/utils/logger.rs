//! Logging configuration using tracing.
//!
//! Every line is written twice: once to stdout and once to an append-only
//! log file that stays open for the lifetime of the process.

use std::fs::OpenOptions;
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified level, mirroring output into `log_file`.
///
/// The returned guard must be kept alive until the process exits, otherwise
/// buffered file output is lost.
pub fn init(level: &str, log_file: &Path) -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (subscriber, guard) = build_subscriber(filter, std::io::stdout, log_file)?;
    subscriber.try_init()?;

    Ok(guard)
}

/// Subscriber writing every event to `console` and appending it to `log_file`.
pub fn build_subscriber<W>(
    filter: EnvFilter,
    console: W,
    log_file: &Path,
) -> std::io::Result<(impl Subscriber + Send + Sync + 'static, WorkerGuard)>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(console))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        );

    Ok((subscriber, guard))
}
