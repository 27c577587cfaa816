//! End-to-end tenant isolation over the in-memory store

use fence_client::{DataClient, DataClientExt, MemoryStore};
use fence_core::{ConfigError, FenceError, IsolationConfig, TenantIsolation};
use fence_model::{OperationDescriptor, OperationKind, Record};
use fence_test_utils::{admin_principal, principal, rec, visitor_policy};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

fn isolation(store: &Arc<MemoryStore>) -> TenantIsolation {
    let config = IsolationConfig::default().with_cache_capacity(4);
    TenantIsolation::new(store.clone(), &config).unwrap()
}

#[tokio::test]
async fn tenants_only_see_their_own_first_timers() -> Result<(), FenceError> {
    let store = MemoryStore::new_shared();
    let fence = isolation(&store);

    let alice = fence.client_for(Some(&principal("church-a"))).await?;
    let bob = fence.client_for(Some(&admin_principal("church-b"))).await?;

    alice
        .create("FirstTimer", rec(json!({ "id": "ft-1", "name": "Ada" })))
        .await?;
    alice
        .create("FirstTimer", rec(json!({ "id": "ft-2", "name": "Grace", "tenantId": "church-b" })))
        .await?;
    bob.create("FirstTimer", rec(json!({ "id": "ft-3", "name": "Linus" })))
        .await?;

    let seen_by_alice = alice.find_many("FirstTimer", Record::new()).await?;
    let seen_by_bob = bob.find_many("FirstTimer", Record::new()).await?;

    assert_eq!(seen_by_alice.len(), 2);
    assert_eq!(seen_by_bob.len(), 1);
    assert_eq!(seen_by_bob[0]["name"], json!("Linus"));
    Ok(())
}

#[tokio::test]
async fn anonymous_requests_use_the_raw_client() -> Result<(), FenceError> {
    let store = MemoryStore::new_shared();
    store.seed(
        "Visitor",
        [
            rec(json!({ "id": "v1", "tenantId": "A" })),
            rec(json!({ "id": "v2", "tenantId": "B" })),
        ],
    );
    let fence = isolation(&store);

    let anonymous = fence.client_for(None).await?;
    assert!(!anonymous.is_scoped());
    assert_eq!(anonymous.count("Visitor", Record::new()).await?, 2);
    assert_eq!(fence.stats().misses, 0);
    Ok(())
}

#[tokio::test]
async fn repeated_requests_reuse_the_tenant_handle() -> Result<(), FenceError> {
    let store = MemoryStore::new_shared();
    let fence = isolation(&store);
    let user = principal("church-a");

    let first = fence.client_for(Some(&user)).await?;
    let second = fence.client_for(Some(&user)).await?;

    assert!(Arc::ptr_eq(
        first.as_scoped().unwrap(),
        second.as_scoped().unwrap()
    ));
    let stats = fence.stats();
    assert_eq!(stats.constructions, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(fence.policy(), &*visitor_policy());
    Ok(())
}

#[tokio::test]
async fn request_stream_never_holds_more_tenants_than_capacity() -> Result<(), FenceError> {
    let store = MemoryStore::new_shared();
    let fence = isolation(&store);
    let users: Vec<_> = (0..10).map(|i| principal(&format!("church-{i}"))).collect();

    for user in &users {
        fence.client_for(Some(user)).await?;
        let resident = users
            .iter()
            .filter(|u| fence.cache().contains(u.tenant_id()))
            .count();
        assert!(resident <= 4, "{resident} tenants resident");
    }

    let stats = fence.stats();
    assert_eq!(stats.evictions, 6);
    assert_eq!(stats.entry_count, 4);
    Ok(())
}

#[tokio::test]
async fn aggregates_and_groups_are_scoped() -> Result<(), FenceError> {
    let store = MemoryStore::new_shared();
    store.seed(
        "FollowUp",
        [
            rec(json!({ "id": "f1", "tenantId": "A", "status": "OPEN", "attempts": 1 })),
            rec(json!({ "id": "f2", "tenantId": "A", "status": "DONE", "attempts": 3 })),
            rec(json!({ "id": "f3", "tenantId": "B", "status": "OPEN", "attempts": 9 })),
        ],
    );
    let fence = isolation(&store);
    let client = fence.client_for(Some(&principal("A"))).await?;

    let totals = client
        .aggregate(
            "FollowUp",
            Record::new(),
            rec(json!({ "_count": true, "_sum": { "attempts": true } })),
        )
        .await?;
    assert_eq!(totals["_count"], json!(2));
    assert_eq!(totals["_sum"]["attempts"], json!(4));

    let groups = client
        .group_by("FollowUp", vec!["status".to_string()], Record::new())
        .await?;
    assert_eq!(
        groups,
        vec![
            rec(json!({ "status": "OPEN", "_count": 1 })),
            rec(json!({ "status": "DONE", "_count": 1 })),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn malformed_bulk_insert_is_a_policy_violation() {
    let store = MemoryStore::new_shared();
    let fence = isolation(&store);
    let client = fence.client_for(Some(&principal("A"))).await.unwrap();

    let op = OperationDescriptor::new("FirstTimer", OperationKind::CreateMany)
        .with_batch(json!([{ "id": "ft-1" }, "not a row"]));
    let err = FenceError::from(client.execute(op).await.unwrap_err());

    assert!(err.is_policy_violation());
    assert_eq!(store.executed(), 0);
    assert!(store.rows(&"FirstTimer".into()).is_empty());
}

#[tokio::test]
async fn invalid_tenant_surfaces_as_cache_error() {
    let store = MemoryStore::new_shared();
    let fence = isolation(&store);

    let err = fence.client_for(Some(&principal(""))).await.unwrap_err();
    assert!(FenceError::from(err).to_string().starts_with("scoped client unavailable"));
}

#[tokio::test]
async fn config_file_drives_policy() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
isolated_entities = ["Visitor"]
tenant_field = "orgId"

[cache]
capacity = 2
"#
    )
    .unwrap();

    let config = IsolationConfig::from_file(file.path()).unwrap();
    let store = MemoryStore::new_shared();
    let fence = TenantIsolation::new(store.clone(), &config).unwrap();
    let client = fence.client_for(Some(&principal("A"))).await.unwrap();

    let row = client.create("Visitor", rec(json!({ "id": "v1" }))).await.unwrap();
    assert_eq!(row["orgId"], json!("A"));
    assert!(row.get("tenantId").is_none());

    // FollowUp is not isolated under this file
    let row = client.create("FollowUp", rec(json!({ "id": "f1" }))).await.unwrap();
    assert!(row.get("orgId").is_none());
}

#[test]
fn missing_config_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = IsolationConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
