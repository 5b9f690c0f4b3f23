//! Authentication context extraction
//!
//! Resolves the `api_access_token` header to a [`Principal`] and carries the
//! request metadata that audit records need. Role and tenant checks live here
//! so handlers state their requirement in one call.

use async_trait::async_trait;
use audit_engine::{Actor, ActorRole, AuditLogEntry};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use logger_redacted::mask_token;
use tracing::warn;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::middleware::{RequestContext, API_TOKEN_HEADER};
use crate::server::ConsoleServer;

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
    pub request: RequestContext,
}

impl AuthContext {
    pub fn new(principal: Principal, request: RequestContext) -> Self {
        Self { principal, request }
    }

    pub fn request_id(&self) -> &str {
        &self.request.request_id
    }

    /// The actor written into audit records
    pub fn actor(&self) -> Actor {
        Actor::new(self.principal.actor_id.clone(), self.principal.role)
            .with_ip(self.request.client_ip.clone())
    }

    pub fn require_super_admin(&self) -> Result<(), ApiError> {
        if self.principal.is_super_admin() {
            Ok(())
        } else {
            Err(ApiError::insufficient_role("This operation requires the super_admin role"))
        }
    }

    /// Read access to an account's resources
    pub fn require_account_access(&self, account_id: i64) -> Result<(), ApiError> {
        if self.principal.is_member_of(account_id) {
            Ok(())
        } else {
            Err(ApiError::tenant_mismatch(account_id))
        }
    }

    /// Write access to an account's resources; agents may only read
    pub fn require_account_admin(&self, account_id: i64) -> Result<(), ApiError> {
        self.require_account_access(account_id)?;
        if self.principal.role == ActorRole::Agent {
            return Err(ApiError::insufficient_role(
                "Agents cannot modify account configuration",
            ));
        }
        Ok(())
    }

    /// Audit endpoints are limited to super admins and administrators
    pub fn require_audit_access(&self) -> Result<(), ApiError> {
        match self.principal.role {
            ActorRole::SuperAdmin | ActorRole::Administrator => Ok(()),
            _ => Err(ApiError::insufficient_role(
                "Audit logs are available to administrators only",
            )),
        }
    }

    /// Which account an audit read covers
    ///
    /// Super admins may pass any account or none (all scopes). Administrators
    /// are pinned to their own accounts; with exactly one membership the
    /// account is inferred.
    pub fn resolve_audit_scope(&self, requested: Option<i64>) -> Result<Option<i64>, ApiError> {
        self.require_audit_access()?;
        if self.principal.is_super_admin() {
            return Ok(requested);
        }

        match (requested, self.principal.account_ids.as_slice()) {
            (Some(id), _) => {
                self.require_account_access(id)?;
                Ok(Some(id))
            }
            (None, [only]) => Ok(Some(*only)),
            (None, _) => Err(ApiError::validation(
                "account_id is required when the token covers several accounts",
            )),
        }
    }

    /// Whether the caller may read a single stored entry
    pub fn can_read_entry(&self, entry: &AuditLogEntry) -> bool {
        if self.principal.is_super_admin() {
            return true;
        }
        self.principal.role == ActorRole::Administrator
            && entry
                .account_id
                .is_some_and(|id| self.principal.account_ids.contains(&id))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    ConsoleServer: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let server = ConsoleServer::from_ref(state);
        let request = RequestContext::from_parts(parts);

        let token = parts
            .headers
            .get(API_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(ApiError::missing_token)?;

        match server.tokens.authenticate(token) {
            Some(principal) => Ok(Self::new(principal, request)),
            None => {
                warn!(
                    token = %mask_token(token),
                    client_ip = %server.redactor.redact_ip(request.client_ip.as_deref()),
                    user_agent = request.user_agent.as_deref().unwrap_or("-"),
                    request_id = %request.request_id,
                    "Rejected unknown api_access_token"
                );
                Err(ApiError::invalid_token())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_engine::{AuditAction, EntityType};
    use axum::http::StatusCode;

    fn context(role: ActorRole, accounts: Vec<i64>) -> AuthContext {
        AuthContext::new(
            Principal {
                actor_id: "9".to_string(),
                name: None,
                role,
                account_ids: accounts,
            },
            RequestContext::default(),
        )
    }

    #[test]
    fn test_agents_read_but_do_not_write() {
        let agent = context(ActorRole::Agent, vec![1]);
        assert!(agent.require_account_access(1).is_ok());
        assert_eq!(
            agent.require_account_admin(1).unwrap_err().status_code(),
            StatusCode::FORBIDDEN
        );
        assert!(agent.require_audit_access().is_err());
    }

    #[test]
    fn test_tenant_isolation() {
        let admin = context(ActorRole::Administrator, vec![1]);
        assert!(admin.require_account_admin(1).is_ok());
        assert!(admin.require_account_access(2).is_err());
        assert!(context(ActorRole::SuperAdmin, vec![]).require_account_admin(2).is_ok());
    }

    #[test]
    fn test_audit_scope_resolution() {
        let admin = context(ActorRole::Administrator, vec![4]);
        assert_eq!(admin.resolve_audit_scope(None).unwrap(), Some(4));
        assert!(admin.resolve_audit_scope(Some(5)).is_err());

        let multi = context(ActorRole::Administrator, vec![4, 5]);
        assert_eq!(multi.resolve_audit_scope(Some(5)).unwrap(), Some(5));
        assert!(multi.resolve_audit_scope(None).is_err());

        let root = context(ActorRole::SuperAdmin, vec![]);
        assert_eq!(root.resolve_audit_scope(None).unwrap(), None);
    }

    #[test]
    fn test_platform_entries_hidden_from_administrators() {
        let entry = |account_id: Option<i64>| AuditLogEntry {
            id: uuid::Uuid::new_v4(),
            sequence: 1,
            request_id: "r".to_string(),
            timestamp: chrono::Utc::now(),
            actor_id: "1".to_string(),
            actor_role: ActorRole::SuperAdmin,
            actor_ip: None,
            entity_type: EntityType::Account,
            action: AuditAction::Create,
            account_id,
            cw_entity_id: None,
            before: None,
            after: None,
            success: true,
            error_message: None,
            hash: String::new(),
            prev_hash: String::new(),
        };
        let admin = context(ActorRole::Administrator, vec![4]);
        assert!(admin.can_read_entry(&entry(Some(4))));
        assert!(!admin.can_read_entry(&entry(Some(5))));
        assert!(!admin.can_read_entry(&entry(None)));
    }

    #[test]
    fn test_actor_carries_client_ip() {
        let mut ctx = context(ActorRole::Administrator, vec![4]);
        ctx.request.client_ip = Some("198.51.100.7".to_string());
        let actor = ctx.actor();
        assert_eq!(actor.id, "9");
        assert_eq!(actor.role, ActorRole::Administrator);
        assert_eq!(actor.ip.as_deref(), Some("198.51.100.7"));
    }
}
