//! Tenant resource endpoints shared by inboxes, agents, teams and labels
//!
//! Each handler is generic over [`TenantResource`] and mounted once per kind
//! under `/api/v1/accounts/:account_id/<kind>`. Reads need membership of the
//! account; writes additionally need an administrator or super admin.
//!
//! The account check up front only decides between 404 and an audited
//! attempt; the write itself re-checks the account under the directory lock.

use audit_engine::AuditAction;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use crate::directory::TenantResource;
use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ConsoleServer;
use crate::services::audit_trail::{AuditTrail, Mutation};
use crate::services::run_detached;
use crate::types::pagination::collection_metadata;
use crate::validation::validated_json;

fn ensure_account(server: &ConsoleServer, account_id: i64) -> ApiResult<()> {
    if server.directory.account_exists(account_id) {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("account {account_id}")))
    }
}

fn mutation<T: TenantResource>(action: AuditAction, account_id: i64) -> Mutation {
    Mutation::new(T::ENTITY, action).account(Some(account_id))
}

pub async fn list<T: TenantResource>(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Vec<T>>>> {
    let Path(account_id) = path?;
    auth.require_account_access(account_id)?;
    ensure_account(&server, account_id)?;

    let rows = server.directory.resources::<T>().list(account_id);
    let metadata = collection_metadata(rows.len(), auth.request_id());
    Ok(Json(api_success_with_meta(rows, metadata)))
}

pub async fn get<T: TenantResource>(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<Json<ApiResponse<T>>> {
    let Path((account_id, id)) = path?;
    auth.require_account_access(account_id)?;
    ensure_account(&server, account_id)?;

    let row = server.directory.resources::<T>().get(account_id, id)?;
    Ok(Json(api_success(row)))
}

pub async fn create<T: TenantResource>(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<T::Create>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<T>>)> {
    let Path(account_id) = path?;
    auth.require_account_admin(account_id)?;
    ensure_account(&server, account_id)?;

    let created = run_detached(async move {
        let outcome = validated_json(body).and_then(|request| {
            server
                .directory
                .insert_resource::<T>(account_id, request)
                .map_err(ApiError::from)
        });

        let created = outcome.as_ref().ok();
        let entry = mutation::<T>(AuditAction::Create, account_id)
            .entity(created.map(|row| row.id()))
            .after(created);
        AuditTrail::new(&server.audit).record_mutation(&auth, entry, &outcome).await?;
        outcome
    })
    .await?;

    Ok((StatusCode::CREATED, Json(api_success(created))))
}

pub async fn update<T: TenantResource>(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<(i64, i64)>, PathRejection>,
    body: Result<Json<T::Update>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<T>>> {
    let Path((account_id, id)) = path?;
    auth.require_account_admin(account_id)?;
    ensure_account(&server, account_id)?;

    let updated = run_detached(async move {
        let outcome = validated_json(body).and_then(|request| {
            server
                .directory
                .update_resource::<T>(account_id, id, request)
                .map_err(ApiError::from)
        });

        let snapshots = outcome.as_ref().ok();
        let entry = mutation::<T>(AuditAction::Update, account_id)
            .entity(Some(id))
            .before(snapshots.map(|(before, _)| before))
            .after(snapshots.map(|(_, after)| after));
        AuditTrail::new(&server.audit).record_mutation(&auth, entry, &outcome).await?;
        outcome.map(|(_, after)| after)
    })
    .await?;

    Ok(Json(api_success(updated)))
}

pub async fn delete<T: TenantResource>(
    State(server): State<ConsoleServer>,
    auth: AuthContext,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<Json<ApiResponse<T>>> {
    let Path((account_id, id)) = path?;
    auth.require_account_admin(account_id)?;
    ensure_account(&server, account_id)?;

    let removed = run_detached(async move {
        let outcome: ApiResult<T> = server
            .directory
            .remove_resource::<T>(account_id, id)
            .map_err(ApiError::from);

        let entry = mutation::<T>(AuditAction::Delete, account_id)
            .entity(Some(id))
            .before(outcome.as_ref().ok());
        AuditTrail::new(&server.audit).record_mutation(&auth, entry, &outcome).await?;
        outcome
    })
    .await?;

    Ok(Json(api_success(removed)))
}
