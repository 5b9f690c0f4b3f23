use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::ConsoleServer;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system health status
    #[schema(example = "healthy")]
    pub status: String,
    /// Current timestamp in RFC3339 format
    #[schema(example = "2026-01-15T10:30:00Z")]
    pub timestamp: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Uptime in seconds
    #[schema(example = 3600)]
    pub uptime: u64,
    /// Individual component checks
    pub checks: HashMap<String, String>,
}

/// Version information response
#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    #[schema(example = "Relay Console")]
    pub name: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Enabled features
    pub features: Vec<String>,
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "System is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(server): State<ConsoleServer>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let mut checks = HashMap::new();
    checks.insert(
        "audit_trail".to_string(),
        if server.audit.config().enabled { "enabled" } else { "disabled" }.to_string(),
    );
    checks.insert(
        "accounts".to_string(),
        server.directory.list_accounts().len().to_string(),
    );

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime_seconds(),
        checks,
    };

    Ok(Json(api_success(response)))
}

/// Version information handler
#[utoipa::path(
    get,
    path = "/version",
    tag = "health",
    responses(
        (status = 200, description = "Version information retrieved successfully", body = VersionResponse)
    )
)]
pub async fn version_info() -> Result<Json<ApiResponse<VersionResponse>>, ApiError> {
    let response = VersionResponse {
        name: "Relay Console".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        features: vec![
            "audit-hash-chain".to_string(),
            "tenant-isolation".to_string(),
            "audit-export".to_string(),
        ],
    };

    Ok(Json(api_success(response)))
}
