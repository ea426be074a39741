//! Tracing setup: console plus a daily-rotated log file.

use clerk_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `verbose`. Console output goes to stderr so it
/// does not mix with chat output on stdout.
pub fn init(
    config: &LoggingConfig,
    verbose: bool,
) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(config.file_prefix.as_str())
        .max_log_files(config.max_files)
        .build(&config.directory)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(guard)
}
