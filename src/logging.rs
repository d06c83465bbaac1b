//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "SMARTCOMMUTE_LOG";

/// Build the filter: `SMARTCOMMUTE_LOG` wins, then `--verbose`, then the configured level.
#[must_use]
pub fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { config.level.as_str() };
        EnvFilter::new(format!("smartcommute={level},tower_http=info,warn"))
    })
}

/// Initialize the global subscriber. Calling it twice is a no-op.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) {
    let filter = build_filter(config, verbose);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if config.format == "json" {
        builder
            .with_file(true)
            .with_line_number(true)
            .json()
            .try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        tracing::debug!("tracing already initialized: {e}");
    }
}
