use super::CliError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn";

/// `--debug` wins over `--log-level`, which wins over `RUST_LOG`.
pub(super) fn filter(log_level: Option<&str>, debug: bool) -> Result<EnvFilter, CliError> {
    if debug {
        return Ok(EnvFilter::new("debug"));
    }
    match log_level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|source| CliError::Usage(format!("invalid --log-level '{level}': {source}"))),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Installs the stderr subscriber once per process; later calls keep the
/// first one.
pub(super) fn init(log_level: Option<&str>, debug: bool) -> Result<(), CliError> {
    let filter = filter(log_level, debug)?;
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
    Ok(())
}
