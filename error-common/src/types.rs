use thiserror::Error;

use crate::codes::{self, ErrorCode};

/// Process-level error for binaries and startup code
#[derive(Error, Debug)]
pub enum RelayError {
    /// Network communication errors (bind, accept)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Audit trail errors surfaced at startup
    #[error("Audit error: {0}")]
    AuditError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Stable code for this error, used in logs
    pub fn code(&self) -> ErrorCode {
        match self {
            RelayError::NetworkError(_) => ErrorCode(codes::system::NETWORK),
            RelayError::ConfigError(_) => ErrorCode(codes::config::INVALID_VALUE),
            RelayError::AuditError(_) => ErrorCode(codes::audit::STORAGE_FAILED),
            RelayError::ServerError(_) | RelayError::InternalError(_) | RelayError::Other(_) => {
                ErrorCode(codes::system::INTERNAL)
            }
        }
    }
}

/// Result type alias for Relay Console operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Log an error together with its code
pub fn log_error(context: &str, error: &RelayError) {
    tracing::error!(
        context = context,
        error_code = %error.code(),
        error = %error,
        "Relay Console error occurred"
    );
}
