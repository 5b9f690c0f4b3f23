//! Persistence backends for audit entries.
//!
//! Stores are append-only: the trait has no update or delete. Chain
//! construction happens in [`AuditEngine`](crate::AuditEngine); a store only
//! keeps entries and answers queries.

mod memory;
mod sqlite;

pub use memory::InMemoryAuditStore;
pub use sqlite::SqliteAuditStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::chain::ChainScope;
use crate::entry::AuditLogEntry;
use crate::error::AuditResult;
use crate::search::{AuditLogFilter, AuditLogPage, PageRequest};

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a sealed entry
    async fn append(&self, entry: &AuditLogEntry) -> AuditResult<()>;

    /// Latest entry of a chain, if any
    async fn head(&self, scope: ChainScope) -> AuditResult<Option<AuditLogEntry>>;

    async fn get(&self, id: Uuid) -> AuditResult<Option<AuditLogEntry>>;

    /// Matching entries, newest first
    async fn search(&self, filter: &AuditLogFilter, page: PageRequest) -> AuditResult<AuditLogPage>;

    /// Every entry of a chain, ascending by sequence
    async fn chain(&self, scope: ChainScope) -> AuditResult<Vec<AuditLogEntry>>;

    /// Scopes that hold at least one entry
    async fn scopes(&self) -> AuditResult<Vec<ChainScope>>;
}
