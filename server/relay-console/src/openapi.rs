use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::handlers::health::health_check,
        crate::handlers::health::version_info,

        // Caller identity
        crate::handlers::profile::get_profile,

        // Audit endpoints
        crate::handlers::audit_logs::list_audit_logs,
        crate::handlers::audit_logs::get_audit_log,
        crate::handlers::audit_logs::export_audit_logs,
        crate::handlers::audit_logs::validate_audit_chain,

        // Account administration
        crate::handlers::accounts::list_accounts,
        crate::handlers::accounts::get_account,
        crate::handlers::accounts::create_account,
        crate::handlers::accounts::update_account,
        crate::handlers::accounts::delete_account,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::handlers::health::VersionResponse,
            crate::handlers::profile::ProfileResponse,
            crate::handlers::audit_logs::ValidateChainRequest,
            crate::error::ApiErrorResponse,
            crate::error::ResponseMetadata,
            crate::error::PaginationInfo,

            // Audit schemas
            audit_engine::AuditLogEntry,
            audit_engine::ChainValidation,
            audit_engine::ActorRole,
            audit_engine::EntityType,
            audit_engine::AuditAction,
            audit_engine::ExportFormat,

            // Tenant directory schemas
            crate::directory::Account,
            crate::directory::AccountStatus,
            crate::directory::CreateAccountRequest,
            crate::directory::UpdateAccountRequest,
            crate::directory::Inbox,
            crate::directory::ChannelType,
            crate::directory::CreateInboxRequest,
            crate::directory::UpdateInboxRequest,
            crate::directory::Agent,
            crate::directory::AgentRole,
            crate::directory::Availability,
            crate::directory::CreateAgentRequest,
            crate::directory::UpdateAgentRequest,
            crate::directory::Team,
            crate::directory::CreateTeamRequest,
            crate::directory::UpdateTeamRequest,
            crate::directory::Label,
            crate::directory::CreateLabelRequest,
            crate::directory::UpdateLabelRequest,
        )
    ),
    modifiers(&ApiTokenAddon),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "profile", description = "Identity of the calling token"),
        (name = "audit", description = "Hash-chained audit trail of administrative changes"),
        (name = "accounts", description = "Platform account administration"),
    ),
    info(
        title = "Relay Console API",
        version = "0.1.0",
        description = "Admin API for a multi-tenant support desk. Tenant resources live under /api/v1/accounts/{account_id}/{inboxes,agents,teams,labels}; every change is recorded in a tamper-evident audit trail.",
    ),
)]
pub struct ApiDoc;

/// Registers the `api_access_token` header scheme
struct ApiTokenAddon;

impl Modify for ApiTokenAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_access_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("api_access_token"))),
            );
        }
    }
}
