//! Serialization of concurrent mutations on a single resource.

use std::sync::{Arc, Barrier};
use std::thread;

use fabryk_acl::{AclRequest, Error, Verb};
use fabryk_core::PrincipalId;

use crate::common::{caller, id, TestHarness};

#[test]
fn test_concurrent_remove_exactly_one_wins() {
    for _ in 0..50 {
        let h = TestHarness::new();
        h.service
            .add(&id("resource"), Verb::Allow, PrincipalId::new("alice"), vec!["view".into()])
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = Arc::clone(&h.service);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    service.remove(&id("resource"), 0)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(Error::Index { index: 0, len: 0 }))));
        assert!(h.service.read(&id("resource")).unwrap().acl.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_all_applied() {
    let h = Arc::new(TestHarness::new());
    let tasks: Vec<_> = (0..32)
        .map(|n| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                let target = if n % 2 == 0 { "resource" } else { "sibling" };
                h.session
                    .apply(
                        &caller("alice"),
                        &id(target),
                        AclRequest::Add {
                            verb: Verb::Allow,
                            principal: PrincipalId::new("bob"),
                            permissions: vec![format!("perm-{n}")],
                        },
                    )
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.service.read(&id("resource")).unwrap().acl.len(), 16);
    assert_eq!(h.service.read(&id("sibling")).unwrap().acl.len(), 16);
    assert_eq!(h.service.audit().newer(None, &[]).len(), 32);
}

#[test]
fn test_readers_never_see_torn_state() {
    let h = TestHarness::new();
    let writer = {
        let service = Arc::clone(&h.service);
        thread::spawn(move || {
            for n in 0..200 {
                service
                    .add(&id("leaf"), Verb::Deny, PrincipalId::new("bob"), vec![format!("p{n}")])
                    .unwrap();
                if n % 3 == 0 {
                    let last = service.read(&id("leaf")).unwrap().acl.len() - 1;
                    service.move_up(&id("leaf"), last).unwrap();
                }
            }
        })
    };
    let mut last_len = 0;
    while !writer.is_finished() {
        let snap = h.service.read(&id("leaf")).unwrap();
        assert!(snap.acl.len() >= last_len);
        assert!(snap.acl.iter().all(|ace| !ace.permissions().is_empty()));
        last_len = snap.acl.len();
    }
    writer.join().unwrap();
    assert_eq!(h.service.read(&id("leaf")).unwrap().acl.len(), 200);
}
