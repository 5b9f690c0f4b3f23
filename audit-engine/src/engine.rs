use chrono::{SubsecRound, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chain::{self, ChainScope, ChainValidation, GENESIS_HASH};
use crate::entry::{AuditLogEntry, NewAuditEntry};
use crate::error::{AuditError, AuditResult};
use crate::export::{self, AuditExport, ExportFormat};
use crate::search::{AuditLogFilter, AuditLogPage, PageRequest, MAX_PAGE_SIZE};
use crate::storage::AuditStore;

/// Audit engine configuration
#[derive(Debug, Clone)]
pub struct AuditEngineConfig {
    pub enabled: bool,
    pub max_page_size: u32,
    pub max_export_rows: usize,
}

impl Default for AuditEngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_page_size: MAX_PAGE_SIZE,
            max_export_rows: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
struct ChainHead {
    sequence: u64,
    hash: String,
}

/// Append-only audit trail with one hash chain per scope
pub struct AuditEngine {
    store: Arc<dyn AuditStore>,
    config: AuditEngineConfig,
    heads: Mutex<HashMap<ChainScope, ChainHead>>,
}

impl AuditEngine {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self::with_config(store, AuditEngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn AuditStore>, config: AuditEngineConfig) -> Self {
        Self {
            store,
            config,
            heads: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AuditEngineConfig {
        &self.config
    }

    /// Seal a draft into the next entry of its scope's chain and persist it
    ///
    /// Appends are serialised so sequences stay gap-free under concurrent
    /// callers. The cached head is taken out of the map while the store
    /// append is pending and only put back once the store acknowledged the
    /// entry; after an error or a cancelled append it is reloaded from the
    /// store on the next call.
    ///
    /// # Errors
    ///
    /// [`AuditError::Disabled`] when auditing is switched off, otherwise any
    /// store or hashing failure.
    pub async fn record(&self, draft: NewAuditEntry) -> AuditResult<AuditLogEntry> {
        if !self.config.enabled {
            return Err(AuditError::Disabled);
        }

        let scope = ChainScope::for_account(draft.account_id);
        let mut heads = self.heads.lock().await;

        let head = match heads.remove(&scope) {
            Some(head) => head,
            None => self.load_head(scope).await?,
        };

        let mut entry = AuditLogEntry {
            id: Uuid::new_v4(),
            sequence: head.sequence + 1,
            request_id: draft.request_id,
            timestamp: Utc::now().trunc_subsecs(6),
            actor_id: draft.actor.id,
            actor_role: draft.actor.role,
            actor_ip: draft.actor.ip,
            entity_type: draft.entity_type,
            action: draft.action,
            account_id: draft.account_id,
            cw_entity_id: draft.cw_entity_id,
            before: draft.before,
            after: draft.after,
            success: draft.success,
            error_message: draft.error_message,
            hash: String::new(),
            prev_hash: head.hash,
        };
        entry.hash = chain::compute_hash(&entry.prev_hash, &entry)?;

        if let Err(e) = self.store.append(&entry).await {
            warn!(scope = %scope, sequence = entry.sequence, error = %e, "Audit append failed, chain head will be reloaded");
            return Err(e);
        }
        heads.insert(
            scope,
            ChainHead {
                sequence: entry.sequence,
                hash: entry.hash.clone(),
            },
        );

        debug!(
            audit_id = %entry.id,
            scope = %scope,
            sequence = entry.sequence,
            entity_type = %entry.entity_type,
            action = %entry.action,
            success = entry.success,
            "Audit entry recorded"
        );

        Ok(entry)
    }

    async fn load_head(&self, scope: ChainScope) -> AuditResult<ChainHead> {
        let head = match self.store.head(scope).await? {
            Some(last) => ChainHead {
                sequence: last.sequence,
                hash: last.hash,
            },
            None => ChainHead {
                sequence: 0,
                hash: GENESIS_HASH.to_string(),
            },
        };
        debug!(scope = %scope, sequence = head.sequence, "Loaded audit chain head");
        Ok(head)
    }

    /// # Errors
    ///
    /// [`AuditError::EntryNotFound`] when no entry has this id.
    pub async fn get(&self, id: Uuid) -> AuditResult<AuditLogEntry> {
        self.store
            .get(id)
            .await?
            .ok_or(AuditError::EntryNotFound(id))
    }

    /// One page of matching entries, newest first
    ///
    /// # Errors
    ///
    /// [`AuditError::InvalidFilter`] for an inverted date range, otherwise
    /// store failures.
    pub async fn list(&self, filter: &AuditLogFilter, page: PageRequest) -> AuditResult<AuditLogPage> {
        filter.validate()?;
        let page = PageRequest::bounded(page.page(), page.page_size(), self.config.max_page_size);
        self.store.search(filter, page).await
    }

    /// Render every matching entry, newest first
    ///
    /// # Errors
    ///
    /// [`AuditError::ExportTooLarge`] when more than `max_export_rows` match.
    pub async fn export(&self, filter: &AuditLogFilter, format: ExportFormat) -> AuditResult<AuditExport> {
        filter.validate()?;
        let limit = u32::try_from(self.config.max_export_rows).unwrap_or(u32::MAX);
        let page = self.store.search(filter, PageRequest::bounded(1, limit, limit)).await?;

        let limit = self.config.max_export_rows;
        if usize::try_from(page.total).map_or(true, |total| total > limit) {
            warn!(matched = page.total, limit, "Audit export rejected, too many entries");
            return Err(AuditError::ExportTooLarge {
                matched: page.total,
                limit,
            });
        }

        let rendered = export::render(&page.entries, format)?;
        info!(rows = rendered.row_count, format = %format, "Audit export generated");
        Ok(rendered)
    }

    /// Verify one account's chain, or every chain when `account_id` is `None`
    ///
    /// Read-only. For the all-scopes check the first broken chain is reported
    /// and its error is prefixed with the scope.
    ///
    /// # Errors
    ///
    /// Store failures only; a broken chain is a successful `valid: false`.
    pub async fn validate_chain(&self, account_id: Option<i64>) -> AuditResult<ChainValidation> {
        if let Some(id) = account_id {
            let scope = ChainScope::Account(id);
            let result = self.validate_scope(scope).await?;
            return Ok(if result.valid { result } else { result.in_scope(scope) });
        }

        let mut checked = 0;
        for scope in self.store.scopes().await? {
            let result = self.validate_scope(scope).await?;
            checked += result.entries_checked;
            if !result.valid {
                return Ok(ChainValidation {
                    entries_checked: checked,
                    ..result.in_scope(scope)
                });
            }
        }

        info!(entries_checked = checked, "Audit chains verified");
        Ok(ChainValidation::intact(checked))
    }

    async fn validate_scope(&self, scope: ChainScope) -> AuditResult<ChainValidation> {
        let entries = self.store.chain(scope).await?;
        let result = chain::verify_chain(scope, &entries);
        if let Some(issue) = &result.issue {
            warn!(scope = %scope, issue = %issue, "Audit chain verification failed");
        }
        Ok(result)
    }
}
