use audit_engine::AuditError;
use axum::{
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::{codes, ErrorCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::directory::DirectoryError;
use crate::middleware::current_request_id;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error category
    pub error_type: String,
    /// Stable machine-readable code
    pub error_code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, Vec<String>>>,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Request ID for correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Response metadata for pagination, etc.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, Vec<String>>>,
    },

    #[error("Authentication error: {message}")]
    Authentication { message: String, code: &'static str },

    #[error("Authorization error: {message}")]
    Authorization { message: String, code: &'static str },

    #[error("Resource not found: {resource_type}")]
    NotFound { resource_type: String },

    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String, code: &'static str },

    #[error("Bad request: {message}")]
    BadRequest { message: String },
}

impl ApiError {
    /// Create a validation error with field-specific errors
    pub fn validation_with_fields(
        message: impl Into<String>,
        field_errors: HashMap<String, Vec<String>>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    /// Missing credentials
    pub fn missing_token() -> Self {
        Self::Authentication {
            message: "Missing api_access_token header".to_string(),
            code: codes::authentication::MISSING_TOKEN,
        }
    }

    /// Credentials that do not map to any actor
    pub fn invalid_token() -> Self {
        Self::Authentication {
            message: "Invalid api_access_token".to_string(),
            code: codes::authentication::INVALID_TOKEN,
        }
    }

    /// The caller's role does not allow the operation
    pub fn insufficient_role(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            code: codes::authorization::INSUFFICIENT_ROLE,
        }
    }

    /// The caller is not a member of the requested account
    pub fn tenant_mismatch(account_id: i64) -> Self {
        Self::Authorization {
            message: format!("Access to account {account_id} is not permitted"),
            code: codes::authorization::TENANT_MISMATCH,
        }
    }

    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The audit trail could not record a mutation
    pub fn audit_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
            code: codes::audit::TRAIL_UNAVAILABLE,
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Internal { .. } => "internal_error",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::BadRequest { .. } => "bad_request",
        }
    }

    /// Stable code from the shared catalogue
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode(match self {
            ApiError::Validation { .. } => codes::validation::INVALID_INPUT,
            ApiError::BadRequest { .. } => codes::validation::INVALID_FORMAT,
            ApiError::Authentication { code, .. }
            | ApiError::Authorization { code, .. }
            | ApiError::ServiceUnavailable { code, .. } => *code,
            ApiError::NotFound { .. } => codes::resource::NOT_FOUND,
            ApiError::Conflict { .. } => codes::resource::CONFLICT,
            ApiError::Internal { .. } => codes::system::INTERNAL,
        })
    }

    /// Get suggested actions for resolving the error
    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Validation { .. } => Some(vec![
                "Check the request payload for invalid fields".to_string(),
                "Ensure all required fields are provided".to_string(),
            ]),
            ApiError::Authentication { .. } => Some(vec![
                "Send a valid token in the api_access_token header".to_string(),
            ]),
            ApiError::Authorization { .. } => Some(vec![
                "Verify your role allows this operation".to_string(),
                "Check that you are a member of the requested account".to_string(),
            ]),
            ApiError::NotFound { .. } => Some(vec![
                "Verify the resource ID is correct".to_string(),
            ]),
            ApiError::ServiceUnavailable { .. } => Some(vec![
                "Try again in a few moments".to_string(),
                "Contact support if the issue persists".to_string(),
            ]),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();
        let request_id = current_request_id();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                error_code = %self.error_code(),
                status_code = %status_code.as_u16(),
                request_id = ?request_id,
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                error_code = %self.error_code(),
                status_code = %status_code.as_u16(),
                request_id = ?request_id,
                error = %self,
                "API request rejected"
            );
        }

        let field_errors = match &self {
            ApiError::Validation { field_errors, .. } => field_errors.clone(),
            _ => None,
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            error_code: self.error_code().to_string(),
            message: self.to_string(),
            field_errors,
            timestamp: chrono::Utc::now(),
            request_id,
            suggestions: self.suggestions(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Helper function to create successful API responses
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

/// Helper function to create successful API responses with metadata
pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: Some(metadata),
    }
}

impl From<AuditError> for ApiError {
    fn from(error: AuditError) -> Self {
        match error {
            AuditError::EntryNotFound(_) => ApiError::not_found("audit log entry"),
            AuditError::InvalidValue { .. }
            | AuditError::InvalidFilter(_)
            | AuditError::UnsupportedFormat(_) => ApiError::bad_request(error.to_string()),
            AuditError::ExportTooLarge { .. } => ApiError::validation(error.to_string()),
            AuditError::Disabled => ApiError::ServiceUnavailable {
                message: error.to_string(),
                code: codes::audit::TRAIL_UNAVAILABLE,
            },
            AuditError::Export(_) => ApiError::ServiceUnavailable {
                message: error.to_string(),
                code: codes::audit::EXPORT_FAILED,
            },
            AuditError::Storage(_) | AuditError::Serialization(_) | AuditError::Database(_) => {
                ApiError::ServiceUnavailable {
                    message: "Audit storage is unavailable".to_string(),
                    code: codes::audit::STORAGE_FAILED,
                }
            }
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::NotFound { kind, id } => ApiError::not_found(format!("{kind} {id}")),
            DirectoryError::Conflict(message) => ApiError::conflict(message),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .into_iter()
            .map(|(field, failures)| {
                let messages = failures
                    .iter()
                    .map(|failure| {
                        failure
                            .message
                            .as_ref()
                            .map_or_else(|| failure.code.to_string(), ToString::to_string)
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        ApiError::validation_with_fields("Request payload failed validation", field_errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[test]
    fn test_status_and_codes() {
        assert_eq!(ApiError::missing_token().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::missing_token().error_code().as_str(), "AUTH_2001");
        assert_eq!(ApiError::tenant_mismatch(3).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::tenant_mismatch(3).error_code().as_str(), "AUTHZ_3003");
        assert_eq!(
            ApiError::audit_unavailable("down").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_audit_error_mapping() {
        let not_found: ApiError = AuditError::EntryNotFound(Uuid::new_v4()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let format: ApiError = AuditError::UnsupportedFormat("xml".into()).into();
        assert_eq!(format.status_code(), StatusCode::BAD_REQUEST);

        let storage: ApiError = AuditError::Storage("disk full".into()).into();
        assert_eq!(storage.error_code().as_str(), "AUDIT_5001");
        assert!(!storage.to_string().contains("disk full"));
    }

    #[test]
    fn test_validation_errors_become_field_errors() {
        let errors = Payload { name: String::new() }.validate().unwrap_err();
        match ApiError::from(errors) {
            ApiError::Validation { field_errors: Some(fields), .. } => {
                assert_eq!(fields["name"], vec!["Name is required".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
