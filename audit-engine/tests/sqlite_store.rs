use std::sync::Arc;

use audit_engine::{
    Actor, ActorRole, AuditAction, AuditEngine, AuditLogFilter, ChainIssue, EntityType, ExportFormat,
    NewAuditEntry, PageRequest, SqliteAuditStore,
};
use serde_json::json;

async fn memory_engine() -> (SqliteAuditStore, AuditEngine) {
    let store = SqliteAuditStore::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory audit database");
    let engine = AuditEngine::new(Arc::new(store.clone()));
    (store, engine)
}

fn inbox_update(account_id: i64, actor: &str, from: &str, to: &str) -> NewAuditEntry {
    NewAuditEntry::new(
        Actor::new(actor, ActorRole::Administrator).with_ip(Some("192.0.2.10".to_string())),
        EntityType::Inbox,
        AuditAction::Update,
    )
    .account(account_id)
    .entity(17)
    .before(json!({ "name": from, "greeting_enabled": false }))
    .after(json!({ "name": to, "greeting_enabled": false }))
}

#[tokio::test]
async fn test_chain_valid_after_round_trip() {
    let (_, engine) = memory_engine().await;
    for i in 0..4 {
        engine
            .record(inbox_update(1, "4", &format!("v{i}"), &format!("v{}", i + 1)))
            .await
            .unwrap();
    }

    let result = engine.validate_chain(Some(1)).await.unwrap();
    assert!(result.valid, "{:?}", result.error);
    assert_eq!(result.entries_checked, 4);
}

#[tokio::test]
async fn test_tampered_after_snapshot_detected() {
    let (store, engine) = memory_engine().await;
    engine.record(inbox_update(1, "4", "Support", "Helpdesk")).await.unwrap();
    let target = engine.record(inbox_update(1, "4", "Helpdesk", "Sales")).await.unwrap();
    engine.record(inbox_update(1, "4", "Sales", "Support")).await.unwrap();

    sqlx::query("UPDATE audit_logs SET after_state = ? WHERE id = ?")
        .bind(r#"{"name":"Nothing to see","greeting_enabled":false}"#)
        .bind(target.id.to_string())
        .execute(store.pool())
        .await
        .unwrap();

    let result = engine.validate_chain(Some(1)).await.unwrap();
    assert!(!result.valid);
    assert_eq!(result.first_invalid_id, Some(target.id));
    assert_eq!(result.issue, Some(ChainIssue::HashMismatch { id: target.id }));
    assert!(result.error.unwrap().starts_with("account:1: "));
}

#[tokio::test]
async fn test_tampered_actor_detected_and_isolated() {
    let (store, engine) = memory_engine().await;
    let target = engine.record(inbox_update(1, "4", "a", "b")).await.unwrap();
    engine.record(inbox_update(2, "9", "c", "d")).await.unwrap();

    sqlx::query("UPDATE audit_logs SET actor_id = 'someone-else' WHERE id = ?")
        .bind(target.id.to_string())
        .execute(store.pool())
        .await
        .unwrap();

    assert!(!engine.validate_chain(Some(1)).await.unwrap().valid);
    assert!(engine.validate_chain(Some(2)).await.unwrap().valid);

    let all = engine.validate_chain(None).await.unwrap();
    assert!(!all.valid);
    assert_eq!(all.first_invalid_id, Some(target.id));
}

#[tokio::test]
async fn test_deleted_row_detected() {
    let (store, engine) = memory_engine().await;
    engine.record(inbox_update(3, "4", "a", "b")).await.unwrap();
    let removed = engine.record(inbox_update(3, "4", "b", "c")).await.unwrap();
    engine.record(inbox_update(3, "4", "c", "d")).await.unwrap();

    sqlx::query("DELETE FROM audit_logs WHERE id = ?")
        .bind(removed.id.to_string())
        .execute(store.pool())
        .await
        .unwrap();

    let result = engine.validate_chain(Some(3)).await.unwrap();
    assert!(!result.valid);
    assert!(matches!(result.issue, Some(ChainIssue::SequenceGap { expected: 2, found: 3, .. })));
}

#[tokio::test]
async fn test_reopened_database_continues_chain() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("audit.db").display());

    let first = {
        let store = SqliteAuditStore::connect(&url).await.unwrap();
        let engine = AuditEngine::new(Arc::new(store.clone()));
        let entry = engine.record(inbox_update(1, "4", "a", "b")).await.unwrap();
        store.pool().close().await;
        entry
    };

    let store = SqliteAuditStore::connect(&url).await.unwrap();
    let engine = AuditEngine::new(Arc::new(store));
    let second = engine.record(inbox_update(1, "4", "b", "c")).await.unwrap();

    assert_eq!(second.sequence, 2);
    assert_eq!(second.prev_hash, first.hash);
    assert!(engine.validate_chain(None).await.unwrap().valid);
}

#[tokio::test]
async fn test_filters_and_pagination() {
    let (_, engine) = memory_engine().await;
    for i in 0..5 {
        engine.record(inbox_update(1, "4", "x", &format!("y{i}"))).await.unwrap();
    }
    engine.record(inbox_update(2, "9", "x", "y")).await.unwrap();
    engine
        .record(
            NewAuditEntry::new(Actor::new("9", ActorRole::Administrator), EntityType::Label, AuditAction::Delete)
                .account(2)
                .entity(5)
                .failed("Label not found"),
        )
        .await
        .unwrap();

    let page = engine
        .list(&AuditLogFilter::for_account(1), PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].sequence, 3);
    assert!(page.has_next());

    let failures = AuditLogFilter {
        success: Some(false),
        ..AuditLogFilter::default()
    };
    let page = engine.list(&failures, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.entries[0].error_message.as_deref(), Some("Label not found"));

    let by_actor = AuditLogFilter {
        actor_id: Some("9".to_string()),
        entity_type: Some(EntityType::Inbox),
        ..AuditLogFilter::default()
    };
    assert_eq!(engine.list(&by_actor, PageRequest::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_export_contains_filtered_rows() {
    let (_, engine) = memory_engine().await;
    engine.record(inbox_update(1, "4", "a", "b")).await.unwrap();
    engine.record(inbox_update(2, "9", "c", "d")).await.unwrap();

    let export = engine
        .export(&AuditLogFilter::for_account(2), ExportFormat::Csv)
        .await
        .unwrap();
    assert_eq!(export.row_count, 1);

    let body = String::from_utf8(export.body).unwrap();
    assert_eq!(body.lines().count(), 2);
    assert!(body.contains("account:2"));
    assert!(!body.contains("account:1"));
}
