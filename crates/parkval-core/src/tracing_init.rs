//! Logging setup shared by the `parkval` and `parkval-mock` binaries.
//!
//! Logs always go to stderr; stdout carries command output only.

use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. With `log_json` every
/// event is written as one JSON object per line.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let output: Box<dyn Layer<Registry> + Send + Sync> = if log_json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry().with(output).with(filter).init();
}
