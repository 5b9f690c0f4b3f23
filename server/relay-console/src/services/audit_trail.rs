//! Records administrative mutations in the audit chain

use audit_engine::{AuditAction, AuditEngine, AuditError, AuditLogEntry, EntityType, NewAuditEntry};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::middleware::AuthContext;

/// What a handler changed, ready to be sealed into an audit entry
#[derive(Debug, Clone)]
pub struct Mutation {
    pub entity_type: EntityType,
    pub action: AuditAction,
    pub account_id: Option<i64>,
    pub entity_id: Option<i64>,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
}

impl Mutation {
    pub fn new(entity_type: EntityType, action: AuditAction) -> Self {
        Self {
            entity_type,
            action,
            account_id: None,
            entity_id: None,
            before: None,
            after: None,
        }
    }

    #[must_use]
    pub fn account(mut self, account_id: Option<i64>) -> Self {
        self.account_id = account_id;
        self
    }

    #[must_use]
    pub fn entity(mut self, entity_id: Option<i64>) -> Self {
        self.entity_id = entity_id;
        self
    }

    #[must_use]
    pub fn before<T: Serialize>(mut self, snapshot: Option<&T>) -> Self {
        self.before = snapshot.and_then(snapshot_of);
        self
    }

    #[must_use]
    pub fn after<T: Serialize>(mut self, snapshot: Option<&T>) -> Self {
        self.after = snapshot.and_then(snapshot_of);
        self
    }
}

fn snapshot_of<T: Serialize>(value: &T) -> Option<JsonValue> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, "Could not serialise audit snapshot");
            None
        }
    }
}

/// Thin wrapper binding the engine to request handling
pub struct AuditTrail<'a> {
    engine: &'a AuditEngine,
}

impl<'a> AuditTrail<'a> {
    pub fn new(engine: &'a AuditEngine) -> Self {
        Self { engine }
    }

    /// Append an entry for `mutation` performed by `auth`
    ///
    /// `outcome` is the result of the mutation itself; failures are recorded
    /// with `success = false`. Returns `Ok(None)` when auditing is switched
    /// off. Any other recording failure is surfaced as 503.
    pub async fn record_mutation<T>(
        &self,
        auth: &AuthContext,
        mutation: Mutation,
        outcome: &Result<T, ApiError>,
    ) -> Result<Option<AuditLogEntry>, ApiError> {
        let mut draft = NewAuditEntry::new(auth.actor(), mutation.entity_type, mutation.action)
            .request_id(auth.request_id());
        draft.account_id = mutation.account_id;
        draft.cw_entity_id = mutation.entity_id;
        draft.before = mutation.before;
        draft.after = mutation.after;
        if let Err(failure) = outcome {
            draft = draft.failed(failure.to_string());
        }

        match self.engine.record(draft).await {
            Ok(entry) => Ok(Some(entry)),
            Err(AuditError::Disabled) => {
                debug!(request_id = %auth.request_id(), "Audit trail disabled, mutation not recorded");
                Ok(None)
            }
            Err(e) => {
                error!(
                    request_id = %auth.request_id(),
                    entity_type = %mutation.entity_type,
                    action = %mutation.action,
                    error = %e,
                    "Failed to record audit entry"
                );
                Err(ApiError::audit_unavailable(
                    "The mutation was applied but could not be recorded in the audit trail",
                ))
            }
        }
    }
}
