use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::LoggingConfig;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
/// Calling it twice is harmless; the first subscriber stays.
pub fn setup_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    if installed.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "logging initialized");
    }
}
