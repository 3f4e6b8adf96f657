//! Change notification as seen through committed edits.

use fabryk_acl::{AclRequest, EventKind, Verb};
use fabryk_core::PrincipalId;
use futures::StreamExt;

use crate::common::{caller, id, TestHarness};

fn add_view(who: &str) -> AclRequest {
    AclRequest::Add {
        verb: Verb::Allow,
        principal: PrincipalId::new(who),
        permissions: vec!["view".into()],
    }
}

#[tokio::test]
async fn test_each_commit_notifies_exactly_once() {
    let h = TestHarness::new();
    let mut sub = h.service.notifier().subscribe(id("resource"));
    let alice = caller("alice");

    h.session.apply(&alice, &id("resource"), add_view("alice")).await.unwrap();
    h.session.apply(&alice, &id("resource"), add_view("bob")).await.unwrap();
    h.session
        .apply(&alice, &id("resource"), AclRequest::MoveDown { index: 0 })
        .await
        .unwrap();
    h.session
        .apply(&alice, &id("resource"), AclRequest::Remove { index: 1 })
        .await
        .unwrap();

    let mut received = 0;
    while let Some(event) = sub.try_recv() {
        assert_eq!(event.kind, EventKind::AclModified);
        assert_eq!(event.resource, id("resource"));
        received += 1;
    }
    assert_eq!(received, 4);
}

#[tokio::test]
async fn test_failed_and_noop_edits_do_not_notify() {
    let h = TestHarness::new();
    let alice = caller("alice");
    h.session.apply(&alice, &id("resource"), add_view("alice")).await.unwrap();
    let mut sub = h.service.notifier().subscribe(id("resource"));

    assert!(h
        .session
        .apply(&alice, &id("resource"), AclRequest::Remove { index: 5 })
        .await
        .is_err());
    h.session
        .apply(&alice, &id("resource"), AclRequest::MoveUp { index: 0 })
        .await
        .unwrap();
    h.session
        .apply(&alice, &id("resource"), AclRequest::MoveDown { index: 0 })
        .await
        .unwrap();

    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn test_ancestor_change_reaches_descendant_subscribers() {
    let h = TestHarness::new();
    let mut leaf = h.service.notifier().subscribe(id("leaf"));
    let mut other = h.service.notifier().subscribe(id("other"));

    h.session
        .apply(&caller("alice"), &id("parent"), add_view("bob"))
        .await
        .unwrap();

    let event = leaf.next().await.unwrap();
    assert_eq!(event.resource, id("parent"));
    assert!(other.try_recv().is_none());
}

#[tokio::test]
async fn test_independent_resources_do_not_interleave() {
    let h = TestHarness::new();
    let mut sibling = h.service.notifier().subscribe(id("sibling"));
    let mut resource = h.service.notifier().subscribe(id("resource"));
    let alice = caller("alice");

    h.session.apply(&alice, &id("sibling"), add_view("bob")).await.unwrap();
    h.session.apply(&alice, &id("resource"), add_view("bob")).await.unwrap();

    assert_eq!(sibling.try_recv().unwrap().resource, id("sibling"));
    assert!(sibling.try_recv().is_none());
    assert_eq!(resource.try_recv().unwrap().resource, id("resource"));
    assert!(resource.try_recv().is_none());
}

#[tokio::test]
async fn test_disconnect_releases_subscription() {
    let h = TestHarness::new();
    let sub = h.service.notifier().subscribe_many(vec![id("leaf"), id("other")]);
    assert_eq!(h.service.notifier().subscriber_count(), 1);
    drop(sub);
    assert_eq!(h.service.notifier().subscriber_count(), 0);

    // Publishing with nobody listening is fine.
    h.session
        .apply(&caller("alice"), &id("leaf"), add_view("bob"))
        .await
        .unwrap();
}
