//! Policy resolution and tag-intersection queries.

mod common;

use common::*;
use vigil_sync::{PolicyDeclaration, PolicyStore, SyncError};
use wiremock::MockServer;

fn declaration(name: &str, tags: &[&str]) -> PolicyDeclaration {
    PolicyDeclaration {
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::test]
async fn resolves_exact_name_from_a_fuzzy_listing() {
    let server = MockServer::start().await;

    // The remote name filter matches loosely; only the exact name counts.
    mock_listing(
        &server,
        "/v2/alerts_policies.json",
        ("filter[name]", "Test Policy1"),
        page(
            "policies",
            vec![
                policy_entry(111111, "Test Policy1"),
                policy_entry(333333, "Test Policy1 Copy"),
            ],
        ),
    )
    .await;
    mock_listing(
        &server,
        "/v2/alerts_conditions.json",
        ("policy_id", "111111"),
        page(
            "conditions",
            vec![
                condition_entry(111111, "CPU % (High)", vec![]),
                condition_entry(222222, "MEM % (High)", vec![]),
            ],
        ),
    )
    .await;

    let client = test_client(&server);
    let mut store = PolicyStore::new();
    store
        .add_policy(&client, &declaration("Test Policy1", &["test1", "test"]))
        .await
        .unwrap();

    let policy = &store.policies()[0];
    assert_eq!(policy.id(), 111111);
    assert_eq!(policy.name(), "Test Policy1");
    assert_eq!(policy.conditions().conditions().len(), 2);
}

#[tokio::test]
async fn unknown_policy_name_fails_with_policy_not_found() {
    let server = MockServer::start().await;

    mock_listing(
        &server,
        "/v2/alerts_policies.json",
        ("filter[name]", "Missing Policy"),
        page("policies", vec![]),
    )
    .await;

    let client = test_client(&server);
    let mut store = PolicyStore::new();
    let err = store
        .add_policy(&client, &declaration("Missing Policy", &[]))
        .await
        .unwrap_err();

    match err {
        SyncError::PolicyNotFound(name) => assert_eq!(name, "Missing Policy"),
        other => panic!("expected PolicyNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_remote_names_fail_as_ambiguous() {
    let server = MockServer::start().await;

    mock_listing(
        &server,
        "/v2/alerts_policies.json",
        ("filter[name]", "Test Policy1"),
        page(
            "policies",
            vec![
                policy_entry(111111, "Test Policy1"),
                policy_entry(222222, "Test Policy1"),
            ],
        ),
    )
    .await;

    let client = test_client(&server);
    let mut store = PolicyStore::new();
    let err = store
        .add_policy(&client, &declaration("Test Policy1", &[]))
        .await
        .unwrap_err();

    match err {
        SyncError::AmbiguousPolicy { name, count } => {
            assert_eq!(name, "Test Policy1");
            assert_eq!(count, 2);
        }
        other => panic!("expected AmbiguousPolicy, got {other:?}"),
    }
}

#[tokio::test]
async fn policies_by_tags_returns_every_intersecting_policy() {
    let server = MockServer::start().await;

    mock_listing(
        &server,
        "/v2/alerts_policies.json",
        ("filter[name]", "Test Policy1"),
        page("policies", vec![policy_entry(111111, "Test Policy1")]),
    )
    .await;
    mock_listing(
        &server,
        "/v2/alerts_policies.json",
        ("filter[name]", "Test Policy2"),
        page("policies", vec![policy_entry(222222, "Test Policy2")]),
    )
    .await;
    mock_listing(
        &server,
        "/v2/alerts_conditions.json",
        ("policy_id", "111111"),
        page("conditions", vec![]),
    )
    .await;
    mock_listing(
        &server,
        "/v2/alerts_conditions.json",
        ("policy_id", "222222"),
        page("conditions", vec![]),
    )
    .await;

    let client = test_client(&server);
    let mut store = PolicyStore::new();
    store
        .add_policy(&client, &declaration("Test Policy1", &["test1", "test"]))
        .await
        .unwrap();
    store
        .add_policy(&client, &declaration("Test Policy2", &["test2", "test"]))
        .await
        .unwrap();

    let shared = store.policies_by_tags(&["test".to_string()]);
    assert_eq!(shared.len(), 2);

    let first_only = store.policies_by_tags(&["test1".to_string()]);
    assert_eq!(first_only.len(), 1);
    assert_eq!(first_only[0].id(), 111111);

    let second_only = store.policies_by_tags(&["test2".to_string()]);
    assert_eq!(second_only.len(), 1);
    assert_eq!(second_only[0].id(), 222222);

    let both = store.policies_by_tags(&["test1".to_string(), "test2".to_string()]);
    assert_eq!(both.len(), 2);

    let none = store.policies_by_tags(&["other".to_string()]);
    assert!(none.is_empty());
}
