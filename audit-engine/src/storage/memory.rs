use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::AuditStore;
use crate::chain::ChainScope;
use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult};
use crate::search::{AuditLogFilter, AuditLogPage, PageRequest};

/// Audit store kept in process memory, in insertion order
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> AuditResult<()> {
        let mut entries = self.entries.write();
        let scope = ChainScope::of(entry);
        if entries
            .iter()
            .any(|e| e.id == entry.id || (e.sequence == entry.sequence && ChainScope::of(e) == scope))
        {
            return Err(AuditError::Storage(format!(
                "entry {} (sequence {} in {scope}) already stored",
                entry.id, entry.sequence
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn head(&self, scope: ChainScope) -> AuditResult<Option<AuditLogEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| ChainScope::of(e) == scope)
            .max_by_key(|e| e.sequence)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> AuditResult<Option<AuditLogEntry>> {
        Ok(self.entries.read().iter().find(|e| e.id == id).cloned())
    }

    async fn search(&self, filter: &AuditLogFilter, page: PageRequest) -> AuditResult<AuditLogPage> {
        let entries = self.entries.read();
        let matching: Vec<&AuditLogEntry> = entries.iter().rev().filter(|e| filter.matches(e)).collect();

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let window = matching
            .iter()
            .skip(offset)
            .take(page.page_size() as usize)
            .map(|e| (*e).clone())
            .collect();

        Ok(AuditLogPage {
            entries: window,
            total: matching.len() as u64,
            page: page.page(),
            page_size: page.page_size(),
        })
    }

    async fn chain(&self, scope: ChainScope) -> AuditResult<Vec<AuditLogEntry>> {
        let mut chain: Vec<AuditLogEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| ChainScope::of(e) == scope)
            .cloned()
            .collect();
        chain.sort_by_key(|e| e.sequence);
        Ok(chain)
    }

    async fn scopes(&self) -> AuditResult<Vec<ChainScope>> {
        let scopes: BTreeSet<ChainScope> = self.entries.read().iter().map(ChainScope::of).collect();
        Ok(scopes.into_iter().collect())
    }
}
