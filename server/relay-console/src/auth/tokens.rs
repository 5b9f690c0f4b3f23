//! `api_access_token` registry
//!
//! Tokens are configured, never issued by this server. Only their SHA-256
//! digests are kept in memory and every lookup compares digests in constant
//! time, so neither the stored secret nor the comparison timing leaks.

use audit_engine::ActorRole;
use config_engine::ApiTokenSettings;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

/// The identity a token grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub actor_id: String,
    pub name: Option<String>,
    pub role: ActorRole,
    /// Accounts the actor is a member of; empty for super admins
    pub account_ids: Vec<i64>,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.role == ActorRole::SuperAdmin
    }

    pub fn is_member_of(&self, account_id: i64) -> bool {
        self.is_super_admin() || self.account_ids.contains(&account_id)
    }
}

#[derive(Debug, Clone)]
struct TokenRecord {
    digest: [u8; 32],
    principal: Principal,
}

#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    records: Vec<TokenRecord>,
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

impl TokenRegistry {
    /// Build the registry from configured tokens
    ///
    /// Entries whose role does not parse are skipped with a warning; settings
    /// validation rejects them before this point in normal startup.
    pub fn from_settings(tokens: &[ApiTokenSettings]) -> Self {
        let records = tokens
            .iter()
            .filter_map(|token| match token.role.parse::<ActorRole>() {
                Ok(role) => Some(TokenRecord {
                    digest: digest(&token.token),
                    principal: Principal {
                        actor_id: token.actor_id.clone(),
                        name: token.name.clone(),
                        role,
                        account_ids: if role == ActorRole::SuperAdmin {
                            Vec::new()
                        } else {
                            token.account_ids.clone()
                        },
                    },
                }),
                Err(e) => {
                    tracing::warn!(actor_id = %token.actor_id, error = %e, "Skipping API token with unknown role");
                    None
                }
            })
            .collect();

        Self { records }
    }

    /// Resolve a presented token
    ///
    /// Every record is compared so the time taken does not depend on which
    /// one matched.
    pub fn authenticate(&self, presented: &str) -> Option<Principal> {
        let candidate = digest(presented);
        let mut found = None;
        for record in &self.records {
            if bool::from(record.digest.ct_eq(&candidate)) {
                found = Some(&record.principal);
            }
        }
        found.cloned()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
