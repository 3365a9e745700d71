//! Multi-source behaviour against in-memory directories.

use std::sync::Arc;

use staffio_core::{Authenticator, DirectoryError, PasswordStore, Staff, StaffStore};
use staffio_ldap::staff::staff_to_entry;
use staffio_ldap::{
    DirectorySource, DirectoryStore, FanOutPolicy, MemoryDirectory, SourceConfig,
};

const BASE: &str = "dc=example,dc=org";
const ADMIN: &str = "cn=admin,dc=example,dc=org";
const BOB: &str = "uid=bob,ou=people,dc=example,dc=org";

fn directory(addr: &str, bob_password: &str) -> MemoryDirectory {
    let directory = MemoryDirectory::new(addr);
    directory.add_identity(ADMIN, "admin-pw");
    let bob = Staff {
        uid: "bob".into(),
        email: format!("bob@{addr}"),
        ..Default::default()
    };
    directory.insert(staff_to_entry(&bob, BOB), bob_password);
    directory
}

fn source(directory: &MemoryDirectory) -> DirectorySource {
    let config = SourceConfig::new(directory.addr(), BASE).with_admin(ADMIN, "admin-pw");
    DirectorySource::new(config, Arc::new(directory.clone()))
}

fn store(directories: &[&MemoryDirectory], policy: FanOutPolicy) -> DirectoryStore {
    DirectoryStore::new(directories.iter().map(|d| source(d)).collect(), policy)
}

#[tokio::test]
async fn test_last_source_error_wins_and_first_change_sticks() {
    let primary = directory("ldap://primary", "old");
    let replica = directory("ldap://replica", "old");
    replica.set_reject_modify(true);
    let store = store(&[&primary, &replica], FanOutPolicy::LastSource);

    let err = store.password_change("bob", "old", "new").await.unwrap_err();
    assert_eq!(err.source_addr(), Some("ldap://replica"));

    // The primary applied the change regardless.
    assert_eq!(primary.password(BOB).as_deref(), Some("new"));
    assert_eq!(replica.password(BOB).as_deref(), Some("old"));
}

#[tokio::test]
async fn test_later_success_masks_earlier_failure() {
    let primary = directory("ldap://primary", "old");
    let replica = directory("ldap://replica", "old");
    primary.set_offline(true);
    let store = store(&[&primary, &replica], FanOutPolicy::LastSource);

    store.password_change("bob", "old", "new").await.unwrap();
    assert_eq!(replica.password(BOB).as_deref(), Some("new"));
}

#[tokio::test]
async fn test_report_lists_every_source() {
    let primary = directory("ldap://primary", "old");
    let replica = directory("ldap://replica", "old");
    replica.set_reject_modify(true);
    let store = store(&[&primary, &replica], FanOutPolicy::LastSource);

    let report = store.password_reset_report("bob", "fresh").await;
    let addrs: Vec<_> = report.outcomes().iter().map(|o| o.source_addr.as_str()).collect();
    assert_eq!(addrs, vec!["ldap://primary", "ldap://replica"]);
    assert!(report.outcomes()[0].result.is_ok());
    assert_eq!(report.failures().count(), 1);
    assert!(!report.all_succeeded());
}

#[tokio::test]
async fn test_all_sources_policy() {
    let primary = directory("ldap://primary", "old");
    let replica = directory("ldap://replica", "old");
    primary.set_reject_modify(true);
    let store = store(&[&primary, &replica], FanOutPolicy::AllSources);

    let err = store.password_reset("bob", "fresh").await.unwrap_err();
    assert_eq!(err.source_addr(), Some("ldap://primary"));
    // The replica was still visited.
    assert_eq!(replica.password(BOB).as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_quorum_policy() {
    let a = directory("ldap://a", "old");
    let b = directory("ldap://b", "old");
    let c = directory("ldap://c", "old");
    c.set_offline(true);

    let two_of_three = store(&[&a, &b, &c], FanOutPolicy::Quorum(2));
    two_of_three.password_reset("bob", "fresh").await.unwrap();

    let all_three = store(&[&a, &b, &c], FanOutPolicy::Quorum(3));
    let err = all_three.password_reset("bob", "fresher").await.unwrap_err();
    assert!(matches!(err, DirectoryError::Connection { .. }));
}

#[tokio::test]
async fn test_wrong_old_password_is_auth_failed() {
    let primary = directory("ldap://primary", "old");
    let store = store(&[&primary], FanOutPolicy::LastSource);

    let err = store.password_change("bob", "guess", "new").await.unwrap_err();
    assert!(err.is_auth_failed());
    assert_eq!(primary.password(BOB).as_deref(), Some("old"));
}

#[tokio::test]
async fn test_authenticate_falls_through_to_replica() {
    let primary = directory("ldap://primary", "stale");
    let replica = directory("ldap://replica", "secret");
    let store = store(&[&primary, &replica], FanOutPolicy::LastSource);

    let staff = store.authenticate("bob", "secret").await.unwrap();
    assert_eq!(staff.email, "bob@ldap://replica");

    let err = store.authenticate("bob", "nope").await.unwrap_err();
    assert_eq!(err, DirectoryError::auth_failed("ldap://replica", BOB));
}

#[tokio::test]
async fn test_staff_lookup() {
    let primary = directory("ldap://primary", "old");
    let store = store(&[&primary], FanOutPolicy::LastSource);

    assert_eq!(store.get("bob").await.unwrap().uid, "bob");
    assert_eq!(store.get_by_dn(BOB).await.unwrap().uid, "bob");
    assert!(store.get("carol").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_no_sources() {
    let store = DirectoryStore::new(Vec::new(), FanOutPolicy::LastSource);
    assert_eq!(
        store.password_reset("bob", "x").await,
        Err(DirectoryError::NoSources)
    );
    assert_eq!(
        store.authenticate("bob", "x").await.unwrap_err(),
        DirectoryError::NoSources
    );
}
