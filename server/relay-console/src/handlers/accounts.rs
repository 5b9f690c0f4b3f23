//! Platform account administration (super admin only)
//!
//! Account records are platform-scoped in the audit trail: `account_id` is
//! empty and `cw_entity_id` carries the account's id. Deleting an account
//! also records a delete for each inbox, agent, team and label it owned, in
//! the account's own chain.

use audit_engine::{AuditAction, EntityType};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use crate::directory::{Account, CreateAccountRequest, TenantResource, UpdateAccountRequest};
use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ConsoleServer;
use crate::services::audit_trail::{AuditTrail, Mutation};
use crate::services::run_detached;
use crate::types::pagination::collection_metadata;
use crate::validation::validated_json;

/// List all accounts
#[utoipa::path(
    get,
    path = "/api/admin/accounts",
    tag = "accounts",
    responses(
        (status = 200, description = "All accounts", body = Vec<Account>),
        (status = 403, description = "Requires super_admin")
    ),
    security(("api_access_token" = []))
)]
pub async fn list_accounts(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<Account>>>> {
    auth.require_super_admin()?;
    let accounts = server.directory.list_accounts();
    let metadata = collection_metadata(accounts.len(), auth.request_id());
    Ok(Json(api_success_with_meta(accounts, metadata)))
}

/// Fetch one account
#[utoipa::path(
    get,
    path = "/api/admin/accounts/{id}",
    tag = "accounts",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = Account),
        (status = 404, description = "No such account")
    ),
    security(("api_access_token" = []))
)]
pub async fn get_account(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Account>>> {
    let Path(id) = path?;
    auth.require_super_admin()?;
    Ok(Json(api_success(server.directory.get_account(id)?)))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/admin/accounts",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Invalid payload"),
        (status = 503, description = "Audit trail unavailable")
    ),
    security(("api_access_token" = []))
)]
pub async fn create_account(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Account>>)> {
    auth.require_super_admin()?;

    let created = run_detached(async move {
        let outcome = validated_json(body)
            .and_then(|request| server.directory.create_account(request).map_err(ApiError::from));

        let created = outcome.as_ref().ok();
        let mutation = Mutation::new(EntityType::Account, AuditAction::Create)
            .entity(created.map(|account| account.id))
            .after(created);
        AuditTrail::new(&server.audit).record_mutation(&auth, mutation, &outcome).await?;
        outcome
    })
    .await?;

    Ok((StatusCode::CREATED, Json(api_success(created))))
}

/// Update an account
#[utoipa::path(
    patch,
    path = "/api/admin/accounts/{id}",
    tag = "accounts",
    params(("id" = i64, Path, description = "Account id")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = Account),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "No such account"),
        (status = 503, description = "Audit trail unavailable")
    ),
    security(("api_access_token" = []))
)]
pub async fn update_account(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Account>>> {
    let Path(id) = path?;
    auth.require_super_admin()?;

    let updated = run_detached(async move {
        let outcome = validated_json(body)
            .and_then(|request| server.directory.update_account(id, request).map_err(ApiError::from));

        let snapshots = outcome.as_ref().ok();
        let mutation = Mutation::new(EntityType::Account, AuditAction::Update)
            .entity(Some(id))
            .before(snapshots.map(|(before, _)| before))
            .after(snapshots.map(|(_, after)| after));
        AuditTrail::new(&server.audit).record_mutation(&auth, mutation, &outcome).await?;
        outcome.map(|(_, after)| after)
    })
    .await?;

    Ok(Json(api_success(updated)))
}

/// Delete an account together with its inboxes, agents, teams and labels
#[utoipa::path(
    delete,
    path = "/api/admin/accounts/{id}",
    tag = "accounts",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted", body = Account),
        (status = 404, description = "No such account"),
        (status = 503, description = "Audit trail unavailable")
    ),
    security(("api_access_token" = []))
)]
pub async fn delete_account(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Account>>> {
    let Path(id) = path?;
    auth.require_super_admin()?;

    let deleted = run_detached(async move {
        let outcome = server.directory.delete_account(id).map_err(ApiError::from);
        let trail = AuditTrail::new(&server.audit);

        if let Ok((_, purged)) = &outcome {
            record_purged(&trail, &auth, &purged.inboxes).await?;
            record_purged(&trail, &auth, &purged.agents).await?;
            record_purged(&trail, &auth, &purged.teams).await?;
            record_purged(&trail, &auth, &purged.labels).await?;
        }

        let mutation = Mutation::new(EntityType::Account, AuditAction::Delete)
            .entity(Some(id))
            .before(outcome.as_ref().ok().map(|(account, _)| account));
        trail.record_mutation(&auth, mutation, &outcome).await?;
        outcome.map(|(account, _)| account)
    })
    .await?;

    Ok(Json(api_success(deleted)))
}

/// One delete entry per row removed along with its account, in that account's chain
async fn record_purged<T: TenantResource>(trail: &AuditTrail<'_>, auth: &AuthContext, rows: &[T]) -> ApiResult<()> {
    for row in rows {
        let mutation = Mutation::new(T::ENTITY, AuditAction::Delete)
            .account(Some(row.account_id()))
            .entity(Some(row.id()))
            .before(Some(row));
        trail.record_mutation(auth, mutation, &Ok::<(), ApiError>(())).await?;
    }
    Ok(())
}
