// Audit entry types and structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AuditError;

/// Kind of administrative object a record is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Account,
    Inbox,
    Label,
    Agent,
    Team,
}

/// Mutation recorded by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

/// Role the actor held when the action was performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    SuperAdmin,
    Administrator,
    Agent,
    /// Internal jobs and migrations
    System,
}

macro_rules! wire_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = AuditError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(AuditError::InvalidValue {
                        field: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_names!(EntityType {
    Account => "account",
    Inbox => "inbox",
    Label => "label",
    Agent => "agent",
    Team => "team",
});

wire_names!(AuditAction {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

wire_names!(ActorRole {
    SuperAdmin => "super_admin",
    Administrator => "administrator",
    Agent => "agent",
    System => "system",
});

/// Who performed an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
    pub ip: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
            ip: None,
        }
    }

    #[must_use]
    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

/// A persisted, chain-linked audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditLogEntry {
    pub id: Uuid,
    /// 1-based position inside the entry's chain
    pub sequence: u64,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub actor_role: ActorRole,
    pub actor_ip: Option<String>,
    pub entity_type: EntityType,
    pub action: AuditAction,
    /// Tenant the record belongs to; `None` for platform-level records
    pub account_id: Option<i64>,
    pub cw_entity_id: Option<i64>,
    #[schema(value_type = Option<Object>)]
    pub before: Option<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub after: Option<JsonValue>,
    pub success: bool,
    pub error_message: Option<String>,
    pub hash: String,
    pub prev_hash: String,
}

/// An audit record as submitted by a caller, before the engine assigns its
/// identity and chain position
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub request_id: String,
    pub actor: Actor,
    pub entity_type: EntityType,
    pub action: AuditAction,
    pub account_id: Option<i64>,
    pub cw_entity_id: Option<i64>,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl NewAuditEntry {
    pub fn new(actor: Actor, entity_type: EntityType, action: AuditAction) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            actor,
            entity_type,
            action,
            account_id: None,
            cw_entity_id: None,
            before: None,
            after: None,
            success: true,
            error_message: None,
        }
    }

    #[must_use]
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn account(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn entity(mut self, entity_id: i64) -> Self {
        self.cw_entity_id = Some(entity_id);
        self
    }

    #[must_use]
    pub fn before(mut self, snapshot: JsonValue) -> Self {
        self.before = Some(snapshot);
        self
    }

    #[must_use]
    pub fn after(mut self, snapshot: JsonValue) -> Self {
        self.after = Some(snapshot);
        self
    }

    /// Mark the action as failed
    #[must_use]
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names_round_trip() {
        for role in ActorRole::ALL {
            assert_eq!(role.as_str().parse::<ActorRole>().unwrap(), *role);
        }
        assert_eq!("team".parse::<EntityType>().unwrap(), EntityType::Team);
        assert!("archive".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_value(ActorRole::SuperAdmin).unwrap(),
            json!("super_admin")
        );
        assert_eq!(serde_json::to_value(EntityType::Inbox).unwrap(), json!("inbox"));
    }

    #[test]
    fn test_builder_sets_fields() {
        let actor = Actor::new("42", ActorRole::Administrator).with_ip(Some("10.0.0.1".into()));
        let draft = NewAuditEntry::new(actor, EntityType::Label, AuditAction::Update)
            .request_id("req-1")
            .account(3)
            .entity(9)
            .before(json!({"title": "vip"}))
            .after(json!({"title": "VIP"}));

        assert_eq!(draft.request_id, "req-1");
        assert_eq!(draft.account_id, Some(3));
        assert_eq!(draft.cw_entity_id, Some(9));
        assert!(draft.success);
        assert_eq!(draft.actor.ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_failed_marks_outcome() {
        let actor = Actor::new("system", ActorRole::System);
        let draft = NewAuditEntry::new(actor, EntityType::Team, AuditAction::Delete).failed("team not found");
        assert!(!draft.success);
        assert_eq!(draft.error_message.as_deref(), Some("team not found"));
    }
}
