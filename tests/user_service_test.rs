//! Role revocation on users and groups

mod common;

use common::TestState;
use pretty_assertions::assert_eq;
use tenantry_core::domain::Member;
use tenantry_core::state::HasServices;
use tenantry_core::AppError;

fn ids(roles: &[&str]) -> Vec<String> {
    roles.iter().map(|r| r.to_string()).collect()
}

#[tokio::test]
async fn test_revoke_roles_from_user() {
    let state = TestState::new();
    state.add_user("u1", &["r1", "r2", "r3"]).await;

    let member = state
        .user_service()
        .revoke_roles("u1", &ids(&["r1", "r3"]), None)
        .await
        .unwrap();

    assert!(matches!(member, Member::User(_)));
    assert_eq!(member.roles(), ids(&["r2"]).as_slice());

    let stored = state.users.all_roles("u1").await;
    assert_eq!(stored, ids(&["r2"]));
}

#[tokio::test]
async fn test_revoke_roles_from_group_of_member() {
    let state = TestState::new();
    state.add_user("u1", &["r1"]).await;
    state.add_group("g1", &["u1"], &["r1", "r2"]).await;

    let member = state
        .user_service()
        .revoke_roles("u1", &ids(&["r1"]), Some("g1"))
        .await
        .unwrap();

    assert_eq!(member.id(), "g1");
    assert_eq!(member.roles(), ids(&["r2"]).as_slice());
    // The user's own roles are untouched.
    assert_eq!(state.users.all_roles("u1").await, ids(&["r1"]));
}

#[tokio::test]
async fn test_revoke_roles_from_group_requires_membership() {
    let state = TestState::new();
    state.add_group("g1", &["someone"], &["r1"]).await;

    let result = state
        .user_service()
        .revoke_roles("u1", &ids(&["r1"]), Some("g1"))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_revoke_roles_unknown_group() {
    let state = TestState::new();

    let result = state
        .user_service()
        .revoke_roles("u1", &ids(&["r1"]), Some("nope"))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
