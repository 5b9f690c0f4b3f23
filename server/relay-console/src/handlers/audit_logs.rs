//! Admin audit log endpoints: search, lookup, export and chain validation

use audit_engine::{AuditLogEntry, AuditLogFilter, ChainValidation, ExportFormat};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ConsoleServer;
use crate::types::pagination::{page_metadata, PaginationParams};
use crate::validation::optional_json;

/// Search parameters for `GET /api/admin/audit-logs`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditLogQuery {
    /// Required for administrators with more than one account
    pub account_id: Option<i64>,
    pub actor_id: Option<String>,
    /// `super_admin`, `administrator`, `agent` or `system`
    pub actor_role: Option<String>,
    /// `account`, `inbox`, `label`, `agent` or `team`
    pub entity_type: Option<String>,
    /// `create`, `update` or `delete`
    pub action: Option<String>,
    pub success: Option<bool>,
    /// RFC3339 timestamp or `YYYY-MM-DD` (start of day, UTC)
    pub start_date: Option<String>,
    /// RFC3339 timestamp or `YYYY-MM-DD` (end of day, UTC)
    pub end_date: Option<String>,
    #[param(minimum = 1)]
    pub page: Option<u32>,
    #[param(minimum = 1, maximum = 100)]
    pub page_size: Option<u32>,
}

/// Parameters for `GET /api/admin/audit-logs/export`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditExportQuery {
    /// `csv` (default) or `json`
    pub format: Option<String>,
    pub account_id: Option<i64>,
    pub actor_id: Option<String>,
    pub actor_role: Option<String>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub success: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Body of `POST /api/admin/audit-logs/validate`
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ValidateChainRequest {
    /// Account whose chain to verify; omitted means every chain (super admin)
    pub account_id: Option<i64>,
}

/// Filter fields shared by search and export
struct Criteria<'a> {
    actor_id: Option<&'a str>,
    actor_role: Option<&'a str>,
    entity_type: Option<&'a str>,
    action: Option<&'a str>,
    success: Option<bool>,
    start_date: Option<&'a str>,
    end_date: Option<&'a str>,
}

impl AuditLogQuery {
    fn criteria(&self) -> Criteria<'_> {
        Criteria {
            actor_id: self.actor_id.as_deref(),
            actor_role: self.actor_role.as_deref(),
            entity_type: self.entity_type.as_deref(),
            action: self.action.as_deref(),
            success: self.success,
            start_date: self.start_date.as_deref(),
            end_date: self.end_date.as_deref(),
        }
    }
}

impl AuditExportQuery {
    fn criteria(&self) -> Criteria<'_> {
        Criteria {
            actor_id: self.actor_id.as_deref(),
            actor_role: self.actor_role.as_deref(),
            entity_type: self.entity_type.as_deref(),
            action: self.action.as_deref(),
            success: self.success,
            start_date: self.start_date.as_deref(),
            end_date: self.end_date.as_deref(),
        }
    }
}

impl Criteria<'_> {
    fn into_filter(self, account_id: Option<i64>) -> ApiResult<AuditLogFilter> {
        Ok(AuditLogFilter {
            account_id,
            actor_id: non_empty(self.actor_id).map(ToString::to_string),
            actor_role: non_empty(self.actor_role).map(str::parse).transpose()?,
            entity_type: non_empty(self.entity_type).map(str::parse).transpose()?,
            action: non_empty(self.action).map(str::parse).transpose()?,
            success: self.success,
            start_date: non_empty(self.start_date)
                .map(|value| parse_date_bound(value, DayBound::Start))
                .transpose()?,
            end_date: non_empty(self.end_date)
                .map(|value| parse_date_bound(value, DayBound::End))
                .transpose()?,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy)]
enum DayBound {
    Start,
    End,
}

/// Accept an RFC3339 instant or a plain date, which covers the whole day
fn parse_date_bound(value: &str, bound: DayBound) -> ApiResult<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(format!(
            "Invalid date '{value}': expected RFC3339 or YYYY-MM-DD"
        ))
    })?;
    let time = match bound {
        DayBound::Start => NaiveTime::MIN,
        DayBound::End => NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

/// Search audit log entries
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    tag = "audit",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Page of audit entries, newest first", body = Vec<AuditLogEntry>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Missing or invalid api_access_token"),
        (status = 403, description = "Role or tenant not permitted")
    ),
    security(("api_access_token" = []))
)]
pub async fn list_audit_logs(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    query: Result<Query<AuditLogQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<AuditLogEntry>>>> {
    let Query(query) = query?;
    let account_id = auth.resolve_audit_scope(query.account_id)?;
    let filter = query.criteria().into_filter(account_id)?;

    let settings = &server.settings.audit;
    let page_request = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    }
    .to_request(settings.default_page_size, settings.max_page_size);

    let page = server.audit.list(&filter, page_request).await?;
    let metadata = page_metadata(&page, auth.request_id());

    Ok(Json(api_success_with_meta(page.entries, metadata)))
}

/// Fetch a single audit entry
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs/{id}",
    tag = "audit",
    params(("id" = Uuid, Path, description = "Audit entry id")),
    responses(
        (status = 200, description = "Audit entry", body = AuditLogEntry),
        (status = 403, description = "Entry belongs to another tenant"),
        (status = 404, description = "No such entry")
    ),
    security(("api_access_token" = []))
)]
pub async fn get_audit_log(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ApiResponse<AuditLogEntry>>> {
    let Path(id) = path?;
    auth.require_audit_access()?;

    let entry = server.audit.get(id).await?;
    if !auth.can_read_entry(&entry) {
        return Err(match entry.account_id {
            Some(account_id) => ApiError::tenant_mismatch(account_id),
            None => ApiError::insufficient_role("Platform audit entries require the super_admin role"),
        });
    }

    Ok(Json(api_success(entry)))
}

/// Download matching audit entries as CSV or JSON
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs/export",
    tag = "audit",
    params(AuditExportQuery),
    responses(
        (status = 200, description = "Export file", content_type = "text/csv"),
        (status = 400, description = "Invalid filter, unknown format or too many rows"),
        (status = 403, description = "Role or tenant not permitted")
    ),
    security(("api_access_token" = []))
)]
pub async fn export_audit_logs(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    query: Result<Query<AuditExportQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let account_id = auth.resolve_audit_scope(query.account_id)?;
    let format = match non_empty(query.format.as_deref()) {
        Some(format) => format.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };
    let filter = query.criteria().into_filter(account_id)?;

    let export = server.audit.export(&filter, format).await?;
    info!(
        actor_id = %auth.principal.actor_id,
        account_id = ?account_id,
        rows = export.row_count,
        format = %format,
        request_id = %auth.request_id(),
        "Audit log export downloaded"
    );

    let disposition = format!("attachment; filename=\"{}\"", export.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

/// Verify the audit hash chain of one account, or of every scope
#[utoipa::path(
    post,
    path = "/api/admin/audit-logs/validate",
    tag = "audit",
    request_body(content = ValidateChainRequest, description = "Optional; an empty body validates every chain"),
    responses(
        (status = 200, description = "Validation outcome; a broken chain is reported with valid = false", body = ChainValidation),
        (status = 403, description = "Role or tenant not permitted"),
        (status = 503, description = "Audit storage unavailable")
    ),
    security(("api_access_token" = []))
)]
pub async fn validate_audit_chain(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ApiResponse<ChainValidation>>> {
    let request: ValidateChainRequest = optional_json(body)?;
    let account_id = auth.resolve_audit_scope(request.account_id)?;

    let result = server.audit.validate_chain(account_id).await?;
    info!(
        actor_id = %auth.principal.actor_id,
        account_id = ?account_id,
        valid = result.valid,
        entries_checked = result.entries_checked,
        request_id = %auth.request_id(),
        "Audit chain validation requested"
    );

    Ok(Json(api_success(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_engine::{ActorRole, EntityType};
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_plain_dates_cover_whole_day() {
        let start = parse_date_bound("2026-03-01", DayBound::Start).unwrap();
        let end = parse_date_bound("2026-03-01", DayBound::End).unwrap();
        assert_eq!(start.hour(), 0);
        assert_eq!(end.hour(), 23);
        assert_eq!(end.nanosecond(), 999_999_000);
        assert_eq!(end.day(), 1);
    }

    #[test]
    fn test_rfc3339_is_normalised_to_utc() {
        let parsed = parse_date_bound("2026-03-01T10:00:00+02:00", DayBound::Start).unwrap();
        assert_eq!(parsed.hour(), 8);
        assert!(parse_date_bound("yesterday", DayBound::End).is_err());
    }

    #[test]
    fn test_criteria_parse_wire_names() {
        let query = AuditLogQuery {
            actor_role: Some("administrator".to_string()),
            entity_type: Some("label".to_string()),
            actor_id: Some("  ".to_string()),
            ..AuditLogQuery::default()
        };
        let filter = query.criteria().into_filter(Some(3)).unwrap();
        assert_eq!(filter.account_id, Some(3));
        assert_eq!(filter.actor_role, Some(ActorRole::Administrator));
        assert_eq!(filter.entity_type, Some(EntityType::Label));
        assert_eq!(filter.actor_id, None);

        let query = AuditLogQuery {
            action: Some("archive".to_string()),
            ..AuditLogQuery::default()
        };
        let error = query.criteria().into_filter(None).unwrap_err();
        assert_eq!(error.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
