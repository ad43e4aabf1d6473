//! Logging setup for binaries embedding the service.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,goldbook=debug";

/// Initializes the tracing subscriber.
///
/// Output goes to stderr so that stdout stays free for command results.
/// Set `RUST_LOG` to override the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
