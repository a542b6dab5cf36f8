//! Tracing initialisation for ideaflow binaries.
//!
//! Diagnostics go to stderr so they interleave cleanly with the console
//! sink's stdout output. Filtering comes from `IDEAFLOW_LOG` (falling back
//! to `RUST_LOG`, then to the supplied default level); setting
//! `IDEAFLOW_LOG_FORMAT=json` or passing `json = true` switches to
//! newline-delimited JSON lines.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "IDEAFLOW_LOG";
const FORMAT_ENV: &str = "IDEAFLOW_LOG_FORMAT";

/// Initialise the global tracing subscriber.
///
/// Safe to call more than once; only the first call takes effect (the
/// global subscriber can only be set once per process).
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let json = json
        || std::env::var(FORMAT_ENV)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .try_init()
            .ok();
    }
}
