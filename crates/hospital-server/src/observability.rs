//! Process-wide tracing setup.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("tracing is already initialised: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Builds the filter for `level`. A non-blank `RUST_LOG` replaces it.
pub fn log_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter, TracingError> {
    let directive = rust_log
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directive).map_err(|source| TracingError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Installs the global subscriber for the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<(), TracingError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = log_filter(&logging.level, rust_log.as_deref())?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()?;
    Ok(())
}
