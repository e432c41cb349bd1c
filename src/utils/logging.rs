//! Logging initialization
//!
//! Installs a `tracing` subscriber for the loader and the CLI:
//! - RUST_LOG takes precedence over any configured filter
//! - A configured filter is used when RUST_LOG is unset
//! - Otherwise the default filter is `info`
//!
//! # Usage
//! ```rust
//! use modloader::utils::init_logging;
//!
//! init_logging(Some("modloader=debug"));
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter used when neither RUST_LOG nor configuration supplies one
pub const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive that applies
///
/// `env` is the value of RUST_LOG, if set.
pub fn effective_filter(env: Option<&str>, configured: Option<&str>) -> String {
    env.or(configured)
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

fn env_filter(configured: Option<&str>) -> EnvFilter {
    let env = std::env::var("RUST_LOG").ok();
    EnvFilter::new(effective_filter(env.as_deref(), configured))
}

/// Initialize human-readable logging on stderr
///
/// Does nothing if a global subscriber is already installed.
pub fn init_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .try_init();
}

/// Initialize logging with JSON lines output
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true),
        )
        .with(env_filter(filter))
        .try_init();
}

/// Initialize logging from the `[logging]` section of [`crate::LoaderConfig`]
pub fn init_logging_from_config(config: Option<&LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.is_some_and(|c| c.json_format) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_takes_precedence() {
        assert_eq!(effective_filter(Some("trace"), Some("debug")), "trace");
    }

    #[test]
    fn test_configured_then_default() {
        assert_eq!(effective_filter(None, Some("modloader=debug")), "modloader=debug");
        assert_eq!(effective_filter(None, None), "info");
        assert_eq!(effective_filter(Some(" "), None), "info");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(Some("warn"));
        init_logging_from_config(Some(&LoggingConfig::default()));
    }
}
