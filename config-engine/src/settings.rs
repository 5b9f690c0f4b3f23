use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};

/// Role names an API token may carry
pub const KNOWN_ROLES: &[&str] = &["super_admin", "administrator", "agent"];

/// Complete Relay Console configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub audit: AuditSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    /// Accounts that exist from startup
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
    #[serde(default)]
    pub logging: LoggerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single request, in seconds
    pub request_timeout_secs: u64,
    /// Origins allowed by CORS; empty means any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where audit records are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditStoreKind {
    /// Process memory; records vanish on restart
    #[default]
    Memory,
    /// SQLite database at `database_url`
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub enabled: bool,
    pub store: AuditStoreKind,
    pub database_url: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_export_rows: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            store: AuditStoreKind::Memory,
            database_url: "sqlite://relay-audit.db?mode=rwc".to_string(),
            default_page_size: 20,
            max_page_size: 100,
            max_export_rows: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub tokens: Vec<ApiTokenSettings>,
}

/// One `api_access_token` and the identity it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTokenSettings {
    pub token: String,
    pub actor_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    /// Accounts the actor belongs to; ignored for `super_admin`
    #[serde(default)]
    pub account_ids: Vec<i64>,
}

/// An account registered with a fixed id when the server starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSeed {
    pub id: i64,
    pub name: String,
}
