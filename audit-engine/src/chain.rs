//! Hash chain construction and verification.
//!
//! Every scope (the platform, or one account) owns an independent chain.
//! The hash of an entry covers its canonical content and the hash of its
//! predecessor, so changing any historical field breaks either the entry's own
//! hash or the link from its successor.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult};

/// `prev_hash` of the first entry of every chain
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// The chain an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainScope {
    /// Records without a tenant, such as account creation by a super admin
    Platform,
    Account(i64),
}

impl ChainScope {
    pub fn for_account(account_id: Option<i64>) -> Self {
        account_id.map_or(ChainScope::Platform, ChainScope::Account)
    }

    pub fn of(entry: &AuditLogEntry) -> Self {
        Self::for_account(entry.account_id)
    }

    pub fn account_id(self) -> Option<i64> {
        match self {
            ChainScope::Platform => None,
            ChainScope::Account(id) => Some(id),
        }
    }
}

impl fmt::Display for ChainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainScope::Platform => f.write_str("platform"),
            ChainScope::Account(id) => write!(f, "account:{id}"),
        }
    }
}

impl FromStr for ChainScope {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "platform" {
            return Ok(ChainScope::Platform);
        }
        s.strip_prefix("account:")
            .and_then(|id| id.parse().ok())
            .map(ChainScope::Account)
            .ok_or_else(|| AuditError::InvalidValue {
                field: "ChainScope",
                value: s.to_string(),
            })
    }
}

/// Deterministic bytes of every hashed field (all but `hash`/`prev_hash`).
///
/// Object keys are sorted at every depth so snapshots hash the same no matter
/// how their maps were ordered when they were built or read back.
///
/// # Errors
///
/// Returns [`AuditError::Serialization`] if the content cannot be encoded.
pub fn canonical_content(entry: &AuditLogEntry) -> AuditResult<Vec<u8>> {
    let mut fields: BTreeMap<&str, JsonValue> = BTreeMap::new();
    fields.insert("id", JsonValue::String(entry.id.to_string()));
    fields.insert("sequence", JsonValue::from(entry.sequence));
    fields.insert("request_id", JsonValue::String(entry.request_id.clone()));
    fields.insert(
        "timestamp",
        JsonValue::String(entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    fields.insert("actor_id", JsonValue::String(entry.actor_id.clone()));
    fields.insert("actor_role", JsonValue::String(entry.actor_role.as_str().to_string()));
    fields.insert("actor_ip", optional_string(entry.actor_ip.as_deref()));
    fields.insert("entity_type", JsonValue::String(entry.entity_type.as_str().to_string()));
    fields.insert("action", JsonValue::String(entry.action.as_str().to_string()));
    fields.insert("account_id", entry.account_id.map_or(JsonValue::Null, JsonValue::from));
    fields.insert("cw_entity_id", entry.cw_entity_id.map_or(JsonValue::Null, JsonValue::from));
    fields.insert("before", entry.before.as_ref().map_or(JsonValue::Null, sort_keys));
    fields.insert("after", entry.after.as_ref().map_or(JsonValue::Null, sort_keys));
    fields.insert("success", JsonValue::Bool(entry.success));
    fields.insert("error_message", optional_string(entry.error_message.as_deref()));

    Ok(serde_json::to_vec(&fields)?)
}

fn optional_string(value: Option<&str>) -> JsonValue {
    value.map_or(JsonValue::Null, |v| JsonValue::String(v.to_string()))
}

fn sort_keys(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let sorted: BTreeMap<&String, JsonValue> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Lowercase hex `SHA-256(prev_hash || canonical_content(entry))`
///
/// # Errors
///
/// Propagates [`canonical_content`] failures.
pub fn compute_hash(prev_hash: &str, entry: &AuditLogEntry) -> AuditResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical_content(entry)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Why a chain failed verification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainIssue {
    #[error("entry {id} belongs to {found}, not {expected}")]
    ForeignScope {
        id: Uuid,
        expected: ChainScope,
        found: ChainScope,
    },

    #[error("entry {id} has sequence {found}, expected {expected}")]
    SequenceGap { id: Uuid, expected: u64, found: u64 },

    #[error("entry {id} does not link to the previous entry's hash")]
    BrokenLink { id: Uuid },

    #[error("entry {id} content does not match its hash")]
    HashMismatch { id: Uuid },
}

impl ChainIssue {
    pub fn entry_id(&self) -> Uuid {
        match self {
            ChainIssue::ForeignScope { id, .. }
            | ChainIssue::SequenceGap { id, .. }
            | ChainIssue::BrokenLink { id }
            | ChainIssue::HashMismatch { id } => *id,
        }
    }
}

/// Outcome of a chain validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChainValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Entries verified before stopping
    pub entries_checked: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_invalid_id: Option<Uuid>,
    #[serde(skip)]
    pub issue: Option<ChainIssue>,
}

impl ChainValidation {
    pub fn intact(entries_checked: u64) -> Self {
        Self {
            valid: true,
            error: None,
            entries_checked,
            first_invalid_id: None,
            issue: None,
        }
    }

    pub fn broken(issue: ChainIssue, entries_checked: u64) -> Self {
        Self {
            valid: false,
            error: Some(issue.to_string()),
            entries_checked,
            first_invalid_id: Some(issue.entry_id()),
            issue: Some(issue),
        }
    }

    /// Prefix the error with the scope it was found in
    #[must_use]
    pub fn in_scope(mut self, scope: ChainScope) -> Self {
        if let Some(error) = self.error.take() {
            self.error = Some(format!("{scope}: {error}"));
        }
        self
    }
}

/// Verify `entries` (ascending by sequence) as the complete chain of `scope`
///
/// Stops at the first issue. A hashing failure is reported as a mismatch of
/// the entry that could not be encoded.
pub fn verify_chain(scope: ChainScope, entries: &[AuditLogEntry]) -> ChainValidation {
    let mut expected_prev = GENESIS_HASH;
    let mut checked = 0_u64;

    for entry in entries {
        let found = ChainScope::of(entry);
        if found != scope {
            return ChainValidation::broken(
                ChainIssue::ForeignScope {
                    id: entry.id,
                    expected: scope,
                    found,
                },
                checked,
            );
        }

        let expected_sequence = checked + 1;
        if entry.sequence != expected_sequence {
            return ChainValidation::broken(
                ChainIssue::SequenceGap {
                    id: entry.id,
                    expected: expected_sequence,
                    found: entry.sequence,
                },
                checked,
            );
        }

        if entry.prev_hash != expected_prev {
            return ChainValidation::broken(ChainIssue::BrokenLink { id: entry.id }, checked);
        }

        match compute_hash(&entry.prev_hash, entry) {
            Ok(hash) if hash == entry.hash => {}
            _ => return ChainValidation::broken(ChainIssue::HashMismatch { id: entry.id }, checked),
        }

        checked += 1;
        expected_prev = &entry.hash;
    }

    ChainValidation::intact(checked)
}
