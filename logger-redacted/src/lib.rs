//! Tracing setup and PII redaction for Relay Console
//!
//! Two concerns live here:
//!
//! - **Subscriber initialisation**: [`init_tracing`] installs a
//!   `tracing-subscriber` registry with an `EnvFilter` and either a pretty,
//!   coloured formatter (development) or one JSON object per line
//!   (production). `RUST_LOG` always wins over the configured level.
//! - **Redaction**: [`PiiRedactor`] masks emails, phone numbers and IPv4
//!   addresses before they are attached to log fields. Redacted values can be
//!   replaced with a short hash so repeated occurrences still correlate.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LoggerConfig, PiiRedactor, RedactionConfig};
//!
//! let config = LoggerConfig::default();
//! init_tracing(&config).expect("subscriber installed once");
//!
//! let redactor = PiiRedactor::new(RedactionConfig::from_logger_config(&config));
//! tracing::info!(client_ip = %redactor.redact_ip(Some("203.0.113.9")), "request accepted");
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events follow the configured level
const WORKSPACE_TARGETS: &[&str] = &["relay_console", "audit_engine", "config_engine"];

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Build the filter directive used when `RUST_LOG` is unset
pub fn default_directives(level: &str) -> String {
    let mut directives: Vec<String> = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push("tower_http=info".to_string());
    directives.push("sqlx=warn".to_string());
    directives.push("hyper=info".to_string());
    directives.join(",")
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Returns [`LoggerError::InvalidFilter`] when the configured level does not
/// parse, and [`LoggerError::AlreadyInitialized`] if a global subscriber is
/// already set.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directives = default_directives(&config.level);
            EnvFilter::try_new(&directives).map_err(|e| LoggerError::InvalidFilter {
                filter: directives.clone(),
                reason: e.to_string(),
            })?
        }
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_workspace() {
        let directives = default_directives("debug");
        assert!(directives.contains("relay_console=debug"));
        assert!(directives.contains("audit_engine=debug"));
        assert!(directives.contains("sqlx=warn"));
    }

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
