//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Install the global subscriber
///
/// `RUST_LOG` wins over `default_level`. Installing twice is harmless; the
/// second call is ignored.
pub fn init_tracing(json: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = result {
        tracing::debug!(%err, "tracing already initialised");
    }
}
