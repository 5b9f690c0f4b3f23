// Stable error codes exposed in API error bodies and process exit logs.

use serde::Serialize;
use std::fmt;

/// A stable, machine-readable error code such as `AUDIT_5003`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
}

pub mod authentication {
    pub const MISSING_TOKEN: &str = "AUTH_2001";
    pub const INVALID_TOKEN: &str = "AUTH_2002";
}

pub mod authorization {
    pub const ACCESS_DENIED: &str = "AUTHZ_3001";
    pub const INSUFFICIENT_ROLE: &str = "AUTHZ_3002";
    pub const TENANT_MISMATCH: &str = "AUTHZ_3003";
}

pub mod resource {
    pub const NOT_FOUND: &str = "RESOURCE_4001";
    pub const CONFLICT: &str = "RESOURCE_4002";
}

pub mod audit {
    pub const STORAGE_FAILED: &str = "AUDIT_5001";
    pub const EXPORT_FAILED: &str = "AUDIT_5002";
    pub const TRAIL_UNAVAILABLE: &str = "AUDIT_5003";
}

pub mod config {
    pub const INVALID_VALUE: &str = "CONFIG_6001";
    pub const LOAD_FAILED: &str = "CONFIG_6002";
}

pub mod system {
    pub const INTERNAL: &str = "SYSTEM_9001";
    pub const NETWORK: &str = "SYSTEM_9002";
}
