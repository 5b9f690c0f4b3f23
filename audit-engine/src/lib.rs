//! Tamper-evident audit trail for Relay Console
//!
//! Every administrative mutation is recorded as an [`AuditLogEntry`] linked
//! into a SHA-256 hash chain. There is one chain per scope: the platform
//! (records without a tenant) and each account. Changing any stored field of a
//! historical entry makes [`AuditEngine::validate_chain`] report it.
//!
//! # Components
//!
//! - **Entries**: wire model of a record and the draft callers submit
//! - **Chain**: canonical hashing and verification
//! - **Storage**: append-only stores, in memory or SQLite
//! - **Search**: filters and pagination
//! - **Export**: CSV and JSON downloads
//!
//! # Example
//!
//! ```rust
//! use audit_engine::{Actor, ActorRole, AuditAction, AuditEngine, EntityType, InMemoryAuditStore, NewAuditEntry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AuditEngine::new(Arc::new(InMemoryAuditStore::new()));
//!
//!     let actor = Actor::new("7", ActorRole::Administrator).with_ip(Some("203.0.113.9".into()));
//!     engine
//!         .record(
//!             NewAuditEntry::new(actor, EntityType::Inbox, AuditAction::Create)
//!                 .account(1)
//!                 .entity(42)
//!                 .after(json!({ "name": "Support" })),
//!         )
//!         .await?;
//!
//!     let validation = engine.validate_chain(Some(1)).await?;
//!     assert!(validation.valid);
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod engine;
pub mod entry;
pub mod error;
pub mod export;
pub mod search;
pub mod storage;

pub use chain::{ChainIssue, ChainScope, ChainValidation, GENESIS_HASH};
pub use engine::*;
pub use entry::*;
pub use error::*;
pub use export::{AuditExport, ExportFormat};
pub use search::{AuditLogFilter, AuditLogPage, PageRequest};
pub use storage::{AuditStore, InMemoryAuditStore, SqliteAuditStore};
