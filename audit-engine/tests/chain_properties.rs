use std::sync::Arc;

use audit_engine::{
    Actor, ActorRole, AuditAction, AuditEngine, AuditLogEntry, ChainScope, EntityType, InMemoryAuditStore,
    NewAuditEntry,
};
use audit_engine::chain::verify_chain;
use proptest::prelude::*;
use serde_json::json;

fn record_all(drafts: Vec<(i64, String)>) -> Vec<AuditLogEntry> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async {
        let engine = AuditEngine::new(Arc::new(InMemoryAuditStore::new()));
        let mut entries = Vec::new();
        for (account_id, name) in drafts {
            let draft = NewAuditEntry::new(Actor::new("2", ActorRole::Administrator), EntityType::Team, AuditAction::Update)
                .account(account_id)
                .entity(1)
                .before(json!({ "name": "old" }))
                .after(json!({ "name": name }));
            entries.push(engine.record(draft).await.unwrap());
        }
        entries
    })
}

fn chain_of(entries: &[AuditLogEntry], scope: ChainScope) -> Vec<AuditLogEntry> {
    entries.iter().filter(|e| ChainScope::of(e) == scope).cloned().collect()
}

proptest! {
    #[test]
    fn recorded_chains_always_verify(drafts in prop::collection::vec((1_i64..4, "[a-z]{1,12}"), 1..30)) {
        let entries = record_all(drafts);
        for account_id in 1..4 {
            let scope = ChainScope::Account(account_id);
            let chain = chain_of(&entries, scope);
            let result = verify_chain(scope, &chain);
            prop_assert!(result.valid);
            prop_assert_eq!(result.entries_checked, chain.len() as u64);
        }
    }

    #[test]
    fn any_snapshot_tamper_is_detected(
        names in prop::collection::vec("[a-z]{1,12}", 1..20),
        pick in any::<prop::sample::Index>(),
        forged in "[A-Z]{1,12}",
    ) {
        let entries = record_all(names.into_iter().map(|n| (1, n)).collect());
        let mut chain = chain_of(&entries, ChainScope::Account(1));
        let victim = pick.index(chain.len());
        chain[victim].after = Some(json!({ "name": forged }));

        let result = verify_chain(ChainScope::Account(1), &chain);
        prop_assert!(!result.valid);
        prop_assert_eq!(result.first_invalid_id, Some(chain[victim].id));
    }

    #[test]
    fn any_actor_tamper_is_detected(
        count in 1_usize..15,
        pick in any::<prop::sample::Index>(),
        forged in "[0-9]{2,6}",
    ) {
        let entries = record_all((0..count).map(|i| (1, format!("n{i}"))).collect());
        let mut chain = chain_of(&entries, ChainScope::Account(1));
        let victim = pick.index(chain.len());
        chain[victim].actor_id = forged;

        prop_assert!(!verify_chain(ChainScope::Account(1), &chain).valid);
    }
}
