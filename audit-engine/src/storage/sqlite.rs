use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use super::AuditStore;
use crate::chain::ChainScope;
use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult};
use crate::search::{AuditLogFilter, AuditLogPage, PageRequest};

const SELECT_COLUMNS: &str = "SELECT id, sequence, request_id, timestamp, actor_id, actor_role, \
     actor_ip, entity_type, action, account_id, cw_entity_id, before_state, after_state, \
     success, error_message, hash, prev_hash FROM audit_logs";

/// Audit store backed by a SQLite database
///
/// Rows are only ever inserted. Timestamps are stored as fixed-width RFC 3339
/// text so lexical order is chronological order.
#[derive(Debug, Clone)]
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    /// Open (creating if needed) the database at `url` and ensure the schema
    ///
    /// An in-memory URL gets a single long-lived connection so every query
    /// sees the same database.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Database`] if the URL is malformed or the
    /// database cannot be opened or migrated.
    pub async fn connect(url: &str) -> AuditResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Use an existing pool
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Database`] if the schema cannot be created.
    pub async fn with_pool(pool: SqlitePool) -> AuditResult<Self> {
        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn initialize_schema(&self) -> AuditResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_logs (
                position INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                scope TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                request_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                actor_role TEXT NOT NULL,
                actor_ip TEXT,
                entity_type TEXT NOT NULL,
                action TEXT NOT NULL,
                account_id INTEGER,
                cw_entity_id INTEGER,
                before_state TEXT,
                after_state TEXT,
                success INTEGER NOT NULL,
                error_message TEXT,
                hash TEXT NOT NULL,
                prev_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_audit_logs_scope_sequence ON audit_logs(scope, sequence)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp ON audit_logs(timestamp)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_logs_actor ON audit_logs(actor_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_logs_account ON audit_logs(account_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs(entity_type)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> AuditResult<()> {
        let sequence = i64::try_from(entry.sequence)
            .map_err(|_| AuditError::Storage(format!("sequence {} out of range", entry.sequence)))?;

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, scope, sequence, request_id, timestamp, actor_id, actor_role,
                actor_ip, entity_type, action, account_id, cw_entity_id,
                before_state, after_state, success, error_message, hash, prev_hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(ChainScope::of(entry).to_string())
        .bind(sequence)
        .bind(&entry.request_id)
        .bind(format_timestamp(&entry.timestamp))
        .bind(&entry.actor_id)
        .bind(entry.actor_role.as_str())
        .bind(entry.actor_ip.as_deref())
        .bind(entry.entity_type.as_str())
        .bind(entry.action.as_str())
        .bind(entry.account_id)
        .bind(entry.cw_entity_id)
        .bind(snapshot_text(entry.before.as_ref())?)
        .bind(snapshot_text(entry.after.as_ref())?)
        .bind(entry.success)
        .bind(entry.error_message.as_deref())
        .bind(&entry.hash)
        .bind(&entry.prev_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn head(&self, scope: ChainScope) -> AuditResult<Option<AuditLogEntry>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE scope = ? ORDER BY sequence DESC LIMIT 1"
        ))
        .bind(scope.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn get(&self, id: Uuid) -> AuditResult<Option<AuditLogEntry>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn search(&self, filter: &AuditLogFilter, page: PageRequest) -> AuditResult<AuditLogPage> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_logs WHERE 1 = 1");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query.push(" WHERE 1 = 1");
        push_filters(&mut query, filter);
        query.push(" ORDER BY timestamp DESC, position DESC LIMIT ");
        query.push_bind(i64::from(page.page_size()));
        query.push(" OFFSET ");
        query.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = query.build().fetch_all(&self.pool).await?;
        let entries = rows.iter().map(entry_from_row).collect::<AuditResult<Vec<_>>>()?;

        Ok(AuditLogPage {
            entries,
            total: u64::try_from(total).unwrap_or_default(),
            page: page.page(),
            page_size: page.page_size(),
        })
    }

    async fn chain(&self, scope: ChainScope) -> AuditResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE scope = ? ORDER BY sequence ASC"))
            .bind(scope.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn scopes(&self) -> AuditResult<Vec<ChainScope>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT DISTINCT scope FROM audit_logs")
            .fetch_all(&self.pool)
            .await?;

        let scopes = names
            .iter()
            .map(|name| name.parse::<ChainScope>())
            .collect::<AuditResult<BTreeSet<_>>>()?;
        Ok(scopes.into_iter().collect())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &AuditLogFilter) {
    if let Some(account_id) = filter.account_id {
        query.push(" AND account_id = ").push_bind(account_id);
    }
    if let Some(actor_id) = &filter.actor_id {
        query.push(" AND actor_id = ").push_bind(actor_id.clone());
    }
    if let Some(role) = filter.actor_role {
        query.push(" AND actor_role = ").push_bind(role.as_str());
    }
    if let Some(entity_type) = filter.entity_type {
        query.push(" AND entity_type = ").push_bind(entity_type.as_str());
    }
    if let Some(action) = filter.action {
        query.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(success) = filter.success {
        query.push(" AND success = ").push_bind(success);
    }
    if let Some(start) = filter.start_date {
        query.push(" AND timestamp >= ").push_bind(format_timestamp(&start));
    }
    if let Some(end) = filter.end_date {
        query.push(" AND timestamp <= ").push_bind(format_timestamp(&end));
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn snapshot_text(snapshot: Option<&serde_json::Value>) -> AuditResult<Option<String>> {
    snapshot.map(serde_json::to_string).transpose().map_err(AuditError::from)
}

fn entry_from_row(row: &SqliteRow) -> AuditResult<AuditLogEntry> {
    let id: String = row.try_get("id")?;
    let sequence: i64 = row.try_get("sequence")?;
    let timestamp: String = row.try_get("timestamp")?;
    let actor_role: String = row.try_get("actor_role")?;
    let entity_type: String = row.try_get("entity_type")?;
    let action: String = row.try_get("action")?;
    let before: Option<String> = row.try_get("before_state")?;
    let after: Option<String> = row.try_get("after_state")?;

    Ok(AuditLogEntry {
        id: Uuid::parse_str(&id).map_err(|e| AuditError::Storage(format!("bad entry id {id}: {e}")))?,
        sequence: u64::try_from(sequence)
            .map_err(|_| AuditError::Storage(format!("bad sequence {sequence} for entry {id}")))?,
        request_id: row.try_get("request_id")?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| AuditError::Storage(format!("bad timestamp {timestamp}: {e}")))?
            .with_timezone(&Utc),
        actor_id: row.try_get("actor_id")?,
        actor_role: actor_role.parse()?,
        actor_ip: row.try_get("actor_ip")?,
        entity_type: entity_type.parse()?,
        action: action.parse()?,
        account_id: row.try_get("account_id")?,
        cw_entity_id: row.try_get("cw_entity_id")?,
        before: before.as_deref().map(serde_json::from_str).transpose()?,
        after: after.as_deref().map(serde_json::from_str).transpose()?,
        success: row.try_get("success")?,
        error_message: row.try_get("error_message")?,
        hash: row.try_get("hash")?,
        prev_hash: row.try_get("prev_hash")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ActorRole, AuditAction, EntityType};
    use chrono::SubsecRound;
    use serde_json::json;

    fn entry(sequence: u64, account_id: Option<i64>) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            sequence,
            request_id: format!("req-{sequence}"),
            timestamp: Utc::now().trunc_subsecs(6),
            actor_id: "1".to_string(),
            actor_role: ActorRole::SuperAdmin,
            actor_ip: None,
            entity_type: EntityType::Account,
            action: AuditAction::Update,
            account_id,
            cw_entity_id: Some(3),
            before: Some(json!({"name": "Acme", "locale": "en"})),
            after: Some(json!({"name": "Acme Inc", "locale": "en"})),
            success: true,
            error_message: None,
            hash: "b".repeat(64),
            prev_hash: "0".repeat(64),
        }
    }

    #[tokio::test]
    async fn test_round_trips_every_column() {
        let store = SqliteAuditStore::connect("sqlite::memory:").await.unwrap();
        let original = entry(1, Some(9));
        store.append(&original).await.unwrap();

        let loaded = store.get(original.id).await.unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_duplicate_sequence_rejected() {
        let store = SqliteAuditStore::connect("sqlite::memory:").await.unwrap();
        store.append(&entry(1, Some(9))).await.unwrap();
        assert!(store.append(&entry(1, Some(9))).await.is_err());
        store.append(&entry(1, Some(10))).await.unwrap();
    }

    #[tokio::test]
    async fn test_head_and_scopes() {
        let store = SqliteAuditStore::connect("sqlite::memory:").await.unwrap();
        assert!(store.head(ChainScope::Platform).await.unwrap().is_none());

        store.append(&entry(1, None)).await.unwrap();
        store.append(&entry(2, None)).await.unwrap();
        store.append(&entry(1, Some(4))).await.unwrap();

        let head = store.head(ChainScope::Platform).await.unwrap().unwrap();
        assert_eq!(head.sequence, 2);
        assert_eq!(
            store.scopes().await.unwrap(),
            vec![ChainScope::Platform, ChainScope::Account(4)]
        );
    }
}
