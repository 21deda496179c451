//! Unit-of-work identity binding tests.
//!
//! A binding is visible to the work it wraps and to nothing else: not to
//! sibling tasks, not to spawned tasks, not after the work ends.

mod common;

use std::time::Duration;

use common::*;

use tenantry_persistence::core::Repository;
use tenantry_persistence::tenant::{IdentityContext, scope};

#[tokio::test]
async fn test_unbound_accessors_return_defaults() {
    assert!(!scope::is_bound());
    assert!(scope::current_tenant().is_empty());
    assert_eq!(scope::current_username(), "");
    assert!(!scope::is_super_admin());
    assert_eq!(scope::current(), IdentityContext::anonymous());
}

#[tokio::test]
async fn test_nested_bindings_shadow_and_restore() {
    scope::bind(alice(), async {
        assert_eq!(scope::current_tenant().as_str(), "tenant-a");

        scope::bind(super_admin(), async {
            assert!(scope::is_super_admin());
            assert_eq!(scope::current_username(), "superadmin");
        })
        .await;

        assert_eq!(scope::current_username(), "alice");
        assert!(!scope::is_super_admin());
    })
    .await;

    assert!(!scope::is_bound());
}

#[test]
fn test_sync_binding_is_restored_after_panic() {
    let result = std::panic::catch_unwind(|| {
        scope::bind_sync(alice(), || {
            assert_eq!(scope::current_username(), "alice");
            panic!("unit of work failed");
        })
    });
    assert!(result.is_err());
    assert!(!scope::is_bound());
    assert_eq!(scope::current_username(), "");
}

#[tokio::test]
async fn test_spawned_tasks_do_not_inherit_binding() {
    let seen = scope::bind(alice(), async {
        tokio::spawn(async { (scope::is_bound(), scope::current_username()) })
            .await
            .unwrap()
    })
    .await;

    assert_eq!(seen, (false, String::new()));
}

#[tokio::test]
async fn test_spawned_tasks_bind_their_own_identity() {
    let seen = scope::bind(alice(), async {
        tokio::spawn(scope::bind(bob(), async { scope::current_username() }))
            .await
            .unwrap()
    })
    .await;

    assert_eq!(seen, "bob");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_units_of_work_do_not_leak() {
    let mut handles = Vec::new();
    for i in 0..32 {
        let ctx = user(&format!("tenant-{}", i), &format!("user-{}", i));
        handles.push(tokio::spawn(scope::bind(ctx, async move {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_millis(1)).await;
                assert_eq!(scope::current_tenant().as_str(), format!("tenant-{}", i));
                assert_eq!(scope::current_username(), format!("user-{}", i));
            }
        })));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_repository_calls_use_the_bound_identity() {
    let store = create_store();
    let notes = store.repository::<Note>();

    let alice_count = scope::bind(alice(), async {
        notes
            .save(&scope::current(), Note::new("mine"))
            .await
            .unwrap();
        notes.list_all(&scope::current()).await.unwrap().len()
    })
    .await;
    assert_eq!(alice_count, 1);

    let bob_count = scope::bind(bob(), async {
        notes.list_all(&scope::current()).await.unwrap().len()
    })
    .await;
    assert_eq!(bob_count, 0);
}
