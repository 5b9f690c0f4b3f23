// Logger configuration
use serde::{Deserialize, Serialize};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, ANSI-coloured lines for local development
    #[default]
    Pretty,
    /// One JSON object per line for log shippers
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default level for workspace crates when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Redact emails, phone numbers and IPs before they reach log fields
    pub redact_pii: bool,
    /// Replace redacted values with a short hash so occurrences can be correlated
    pub hash_for_correlation: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            redact_pii: true,
            hash_for_correlation: true,
        }
    }
}
