//! Integration tests for the role repository.

use role_repository::{
    Error, ErrorKind, MemorySink, NullSink, RepositoryConfig, RoleRecord, RoleRepository,
};
use std::collections::BTreeSet;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_admin_lifecycle() {
    let repo = RoleRepository::new(MemorySink::new());

    let admin = RoleRecord::new("admin", ["alice"]);
    repo.create(admin.clone()).unwrap();
    assert_eq!(repo.get_role_names_by_username("alice"), set(&["admin"]));

    let with_bob = RoleRecord::new("admin", ["alice", "bob"]);
    repo.update(&admin, &with_bob).unwrap();
    assert_eq!(repo.get_role_names_by_username("bob"), set(&["admin"]));

    assert!(repo.delete(&with_bob).unwrap());
    assert!(repo.get_role_names_by_username("alice").is_empty());
    assert!(repo.get_role_names_by_username("bob").is_empty());
}

#[test]
fn test_created_role_is_visible() {
    let repo = RoleRepository::new(NullSink);
    let role = RoleRecord::new("reader", ["alice", "bob"]);

    assert!(repo.is_valid_role_name(role.name()));
    repo.create(role.clone()).unwrap();

    assert_eq!(repo.get_role_by_name("reader"), Some(role));
    assert!(repo.get_all_role_names().contains("reader"));
}

#[test]
fn test_duplicate_create_leaves_count_unchanged() {
    let repo = RoleRepository::new(NullSink);
    repo.create(RoleRecord::empty("admin")).unwrap();
    repo.create(RoleRecord::empty("reader")).unwrap();

    let err = repo.create(RoleRecord::new("admin", ["mallory"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    assert_eq!(repo.number_of_roles(), 2);
    assert!(repo.get_role_names_by_username("mallory").is_empty());
}

#[test]
fn test_stale_update_changes_nothing() {
    let sink = MemorySink::new();
    let repo = RoleRepository::new(sink.clone());
    let current = RoleRecord::new("admin", ["alice"]);
    repo.create(current.clone()).unwrap();

    let stale = RoleRecord::new("admin", ["alice", "bob"]);
    let err = repo
        .update(&stale, &RoleRecord::new("admin", ["carol"]))
        .unwrap_err();

    assert!(matches!(err, Error::ConcurrentModification(ref name) if name == "admin"));
    assert_eq!(repo.get_role_by_name("admin"), Some(current.clone()));
    assert_eq!(repo.roles().as_slice(), &[current]);
    assert!(repo.get_role_names_by_username("carol").is_empty());
    assert_eq!(sink.commit_count(), 1);
}

#[test]
fn test_update_of_missing_role_is_a_conflict() {
    let repo = RoleRepository::new(NullSink);
    let ghost = RoleRecord::empty("ghost");

    let err = repo.update(&ghost, &ghost).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(repo.number_of_roles(), 0);
}

#[test]
fn test_update_membership_properties() {
    let repo = RoleRepository::new(NullSink);
    let existing = RoleRecord::new("ops", ["alice", "bob", "carol"]);
    repo.create(existing.clone()).unwrap();
    repo.create(RoleRecord::new("reader", ["alice"])).unwrap();

    let updated = RoleRecord::new("ops", ["carol", "dave"]);
    repo.update(&existing, &updated).unwrap();

    assert_eq!(repo.get_role_by_name("ops"), Some(updated.clone()));
    for departed in existing.users().difference(updated.users()) {
        assert!(!repo.get_role_names_by_username(departed).contains("ops"));
    }
    for member in updated.users() {
        assert!(repo.get_role_names_by_username(member).contains("ops"));
    }
    // Memberships in other roles are untouched
    assert_eq!(repo.get_role_names_by_username("alice"), set(&["reader"]));
}

#[test]
fn test_retry_after_conflict() {
    let repo = RoleRepository::new(NullSink);
    let original = RoleRecord::new("admin", ["alice"]);
    repo.create(original.clone()).unwrap();

    repo.update(&original, &original.augment().with_user("bob").build())
        .unwrap();

    // Second writer: stale attempt, re-read, retry
    let attempt = original.augment().with_user("carol").build();
    let err = repo.update(&original, &attempt).unwrap_err();
    assert!(err.is_retryable());

    let fresh = repo.get_role_by_name("admin").unwrap();
    repo.update(&fresh, &fresh.augment().with_user("carol").build())
        .unwrap();

    assert_eq!(
        repo.get_role_by_name("admin"),
        Some(RoleRecord::new("admin", ["alice", "bob", "carol"]))
    );
}

#[test]
fn test_delete_unknown_role() {
    let sink = MemorySink::new();
    let repo = RoleRepository::new(sink.clone());
    repo.create(RoleRecord::new("admin", ["alice"])).unwrap();
    let before = repo.roles();

    assert!(!repo.delete(&RoleRecord::empty("writer")).unwrap());

    assert_eq!(repo.roles(), before);
    assert!(repo.get_role_by_name("admin").is_some());
    assert_eq!(sink.commit_count(), 1);
}

#[test]
fn test_remove_user_from_all_roles() {
    let repo = RoleRepository::new(NullSink);
    for (name, users) in [
        ("admin", vec!["alice"]),
        ("reader", vec!["alice", "bob"]),
        ("writer", vec!["alice", "carol"]),
        ("audit", vec!["bob"]),
    ] {
        repo.create(RoleRecord::new(name, users)).unwrap();
    }

    repo.remove_user_from_all_roles("alice").unwrap();

    assert!(repo.get_role_names_by_username("alice").is_empty());
    assert_eq!(repo.get_role_names_by_username("bob"), set(&["audit", "reader"]));
    assert_eq!(repo.get_role_names_by_username("carol"), set(&["writer"]));
    assert_eq!(repo.number_of_roles(), 4);
    assert!(repo.check_consistency().is_consistent());
}

#[test]
fn test_role_order_is_insertion_order() {
    let repo = RoleRepository::new(NullSink);
    for name in ["zeta", "alpha", "mid"] {
        repo.create(RoleRecord::empty(name)).unwrap();
    }

    let order: Vec<_> = repo.roles().iter().map(|r| r.name().to_string()).collect();
    assert_eq!(order, vec!["zeta", "alpha", "mid"]);

    // Update keeps the position
    let alpha = repo.get_role_by_name("alpha").unwrap();
    repo.update(&alpha, &alpha.augment().with_user("bob").build())
        .unwrap();
    assert_eq!(repo.roles()[1].name(), "alpha");
}

#[test]
fn test_configuration() {
    let config = RepositoryConfig::builder()
        .role_name_pattern("^[a-z][a-z_]*$")
        .build()
        .unwrap();
    let repo = RoleRepository::with_config(NullSink, config).unwrap();

    assert!(repo.is_valid_role_name("site_admin"));
    assert!(!repo.is_valid_role_name("Admin"));
    assert!(!repo.is_valid_role_name("_admin"));

    let err = repo.create(RoleRecord::empty("42")).unwrap_err();
    assert!(matches!(err, Error::InvalidRoleName(_)));
}

#[test]
fn test_metrics() {
    let repo = RoleRepository::new(NullSink);
    let admin = RoleRecord::new("admin", ["alice"]);

    repo.create(admin.clone()).unwrap();
    let _ = repo.create(admin.clone());
    let _ = repo.create(RoleRecord::empty("bad name"));
    repo.update(&admin, &RoleRecord::empty("admin")).unwrap();
    let _ = repo.update(&admin, &RoleRecord::empty("admin"));
    repo.get_role_by_name("admin");
    repo.get_role_names_by_username("alice");
    repo.delete(&RoleRecord::empty("admin")).unwrap();

    let snapshot = repo.metrics().snapshot();
    assert_eq!(snapshot.creates, 1);
    assert_eq!(snapshot.updates, 1);
    assert_eq!(snapshot.deletes, 1);
    assert_eq!(snapshot.conflicts, 1);
    assert_eq!(snapshot.validation_failures, 2);
    assert_eq!(snapshot.lookups, 2);
    assert_eq!(snapshot.persistence_failures, 0);
}

#[cfg(feature = "async")]
mod async_tests {
    use super::*;
    use role_repository::AsyncRoleRepository;

    #[tokio::test]
    async fn test_async_basic_operations() {
        let repo = AsyncRoleRepository::new(RoleRepository::new(MemorySink::new()));

        let admin = RoleRecord::new("admin", ["alice"]);
        repo.create(admin.clone()).await.unwrap();

        let err = repo.create(admin.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);

        assert_eq!(repo.get_role_names_by_username("alice"), set(&["admin"]));
        assert_eq!(repo.get_all_role_names().await.unwrap(), set(&["admin"]));
    }
}
