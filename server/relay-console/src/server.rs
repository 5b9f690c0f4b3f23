use anyhow::Result;
use audit_engine::{AuditEngine, AuditEngineConfig, AuditStore, InMemoryAuditStore, SqliteAuditStore};
use chrono::{DateTime, Utc};
use config_engine::{AuditStoreKind, Settings};
use logger_redacted::{PiiRedactor, RedactionConfig};
use std::sync::Arc;
use tracing::info;

use crate::auth::TokenRegistry;
use crate::directory::TenantDirectory;

/// Shared state of the Relay Console server
#[derive(Clone)]
pub struct ConsoleServer {
    /// Loaded configuration
    pub settings: Arc<Settings>,
    /// Hash-chained audit trail
    pub audit: Arc<AuditEngine>,
    /// Accounts and their resources
    pub directory: Arc<TenantDirectory>,
    /// Configured `api_access_token`s
    pub tokens: Arc<TokenRegistry>,
    /// Redacts client details before they are logged
    pub redactor: Arc<PiiRedactor>,
    pub started_at: DateTime<Utc>,
}

impl ConsoleServer {
    /// Build the server with the audit store selected in `settings`
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let store: Arc<dyn AuditStore> = match settings.audit.store {
            AuditStoreKind::Memory => Arc::new(InMemoryAuditStore::new()),
            AuditStoreKind::Sqlite => {
                Arc::new(SqliteAuditStore::connect(&settings.audit.database_url).await?)
            }
        };
        info!(store = ?settings.audit.store, "Audit store ready");
        Ok(Self::with_store(settings, store))
    }

    /// Build the server over an existing audit store
    pub fn with_store(settings: Settings, store: Arc<dyn AuditStore>) -> Self {
        let audit = AuditEngine::with_config(
            store,
            AuditEngineConfig {
                enabled: settings.audit.enabled,
                max_page_size: settings.audit.max_page_size,
                max_export_rows: settings.audit.max_export_rows,
            },
        );

        let directory = TenantDirectory::new();
        for seed in &settings.accounts {
            directory.seed_account(seed.id, seed.name.clone());
        }

        let tokens = TokenRegistry::from_settings(&settings.auth.tokens);
        let redactor = PiiRedactor::new(RedactionConfig::from_logger_config(&settings.logging));

        info!(
            accounts = settings.accounts.len(),
            tokens = tokens.len(),
            audit_enabled = settings.audit.enabled,
            "Relay Console state initialised"
        );

        Self {
            settings: Arc::new(settings),
            audit: Arc::new(audit),
            directory: Arc::new(directory),
            tokens: Arc::new(tokens),
            redactor: Arc::new(redactor),
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0)
    }
}
