use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    directory::{Agent, Inbox, Label, Team, TenantResource},
    handlers::{accounts, audit_logs, health, profile, resources},
    openapi::ApiDoc,
    server::ConsoleServer,
};

/// Route path constants
pub mod paths {
    pub mod health {
        pub const HEALTH: &str = "/health";
        pub const VERSION: &str = "/version";
        pub const OPENAPI: &str = "/api-docs/openapi.json";
    }

    pub mod admin {
        pub const AUDIT_LOGS: &str = "/api/admin/audit-logs";
        pub const AUDIT_LOG_BY_ID: &str = "/api/admin/audit-logs/:id";
        pub const AUDIT_LOGS_EXPORT: &str = "/api/admin/audit-logs/export";
        pub const AUDIT_LOGS_VALIDATE: &str = "/api/admin/audit-logs/validate";
        pub const ACCOUNTS: &str = "/api/admin/accounts";
        pub const ACCOUNT_BY_ID: &str = "/api/admin/accounts/:id";
    }

    pub mod api_v1 {
        pub const PROFILE: &str = "/api/v1/profile";
        pub const ACCOUNT_PREFIX: &str = "/api/v1/accounts/:account_id";
        pub const INBOXES: &str = "inboxes";
        pub const AGENTS: &str = "agents";
        pub const TEAMS: &str = "teams";
        pub const LABELS: &str = "labels";
    }
}

/// Health, version and API document
pub fn health_routes() -> Router<ConsoleServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::VERSION, get(health::version_info))
        .route(paths::health::OPENAPI, get(|| async { Json(ApiDoc::openapi()) }))
}

/// Audit log and account administration
pub fn admin_routes() -> Router<ConsoleServer> {
    Router::new()
        .route(paths::admin::AUDIT_LOGS, get(audit_logs::list_audit_logs))
        // Static segments take precedence over `:id`
        .route(paths::admin::AUDIT_LOGS_EXPORT, get(audit_logs::export_audit_logs))
        .route(paths::admin::AUDIT_LOGS_VALIDATE, post(audit_logs::validate_audit_chain))
        .route(paths::admin::AUDIT_LOG_BY_ID, get(audit_logs::get_audit_log))
        .route(
            paths::admin::ACCOUNTS,
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            paths::admin::ACCOUNT_BY_ID,
            get(accounts::get_account)
                .patch(accounts::update_account)
                .delete(accounts::delete_account),
        )
}

/// Collection and item routes for one tenant resource kind
fn tenant_resource<T: TenantResource>(router: Router<ConsoleServer>, segment: &str) -> Router<ConsoleServer> {
    let collection = format!("{}/{segment}", paths::api_v1::ACCOUNT_PREFIX);
    let item = format!("{collection}/:id");

    router
        .route(&collection, get(resources::list::<T>).post(resources::create::<T>))
        .route(
            &item,
            get(resources::get::<T>)
                .patch(resources::update::<T>)
                .delete(resources::delete::<T>),
        )
}

/// Operator-facing API scoped to an account
pub fn tenant_routes() -> Router<ConsoleServer> {
    let router = Router::new().route(paths::api_v1::PROFILE, get(profile::get_profile));
    let router = tenant_resource::<Inbox>(router, paths::api_v1::INBOXES);
    let router = tenant_resource::<Agent>(router, paths::api_v1::AGENTS);
    let router = tenant_resource::<Team>(router, paths::api_v1::TEAMS);
    tenant_resource::<Label>(router, paths::api_v1::LABELS)
}

/// Every route of the server
pub fn create_routes() -> Router<ConsoleServer> {
    Router::new()
        .merge(health_routes())
        .merge(admin_routes())
        .merge(tenant_routes())
}
