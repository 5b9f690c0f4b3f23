use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit logging is disabled")]
    Disabled,

    #[error("Audit entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error("Invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid audit filter: {0}")]
    InvalidFilter(String),

    #[error("Unsupported export format: {0} (expected csv or json)")]
    UnsupportedFormat(String),

    #[error("Export of {matched} entries exceeds the limit of {limit}; narrow the filters")]
    ExportTooLarge { matched: u64, limit: usize },

    #[error("Audit storage error: {0}")]
    Storage(String),

    #[error("Audit export failed: {0}")]
    Export(String),

    #[error("Audit serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
