//! Logging bootstrap. Stdout carries JSON-RPC, so logs go to stderr.

use forgemcp::{Error, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "info";

/// Build the log filter from an explicit directive string.
pub fn filter(directives: Option<&str>) -> Result<EnvFilter> {
    let directives = directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directives)
        .map_err(|e| Error::InvalidConfiguration(format!("invalid log filter '{directives}': {e}")))
}

/// Install the global subscriber.
pub fn init(directives: Option<&str>) -> Result<()> {
    fmt()
        .with_env_filter(filter(directives)?)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::InternalError(format!("failed to install logger: {e}")))
}
