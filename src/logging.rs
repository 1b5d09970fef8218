use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "PMT_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Builds the filter: `PMT_LOG` when set and valid, otherwise `warn`
/// (`debug` with `--verbose`).
fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Installs the stderr subscriber. Calling it again is a no-op.
pub fn init(verbose: bool) {
    if let Err(e) = fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        tracing::debug!(error = %e, "tracing already initialized");
    }
}
