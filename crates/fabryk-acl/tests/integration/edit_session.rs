//! Edit session scenarios over a multi-level tree.

use std::sync::Arc;

use fabryk_acl::{
    AclAuthorizer, AclRequest, Decision, Error, ErrorKind, Verb, ACL_MODIFIED, CHANGE_ACLS,
};
use fabryk_core::PrincipalId;
use serde_json::json;

use crate::common::{caller, id, TestHarness};

// ============================================================================
// Inheritance scenarios
// ============================================================================

#[tokio::test]
async fn test_own_allow_beats_parent_deny() {
    let h = TestHarness::new();
    let alice = caller("alice");
    h.session
        .handle(
            &alice,
            &id("parent"),
            json!({"op": "add", "verb": "Deny", "principal": "alice", "permissions": ["view"]}),
        )
        .await
        .unwrap();
    h.session
        .handle(
            &alice,
            &id("resource"),
            json!({"op": "add", "verb": "Allow", "principal": "alice", "permissions": ["view"]}),
        )
        .await
        .unwrap();

    let parent = h.resolver.effective_parent_acl(&id("resource")).unwrap().unwrap();
    assert_eq!(parent.resource, id("parent"));
    assert_eq!(parent.acl, h.service.read(&id("parent")).unwrap().acl);

    let decision = h
        .resolver
        .permits(&id("resource"), &alice.principals(), "view")
        .unwrap();
    assert_eq!(decision, Decision::Allowed { source: id("resource") });
}

#[tokio::test]
async fn test_disabling_inheritance_hides_parent_acl() {
    let h = TestHarness::new();
    h.service
        .add(&id("root"), Verb::Allow, PrincipalId::new("bob"), vec!["view".into()])
        .unwrap();
    h.service
        .add(&id("parent"), Verb::Deny, PrincipalId::new("bob"), vec!["view".into()])
        .unwrap();

    let outcome = h
        .session
        .apply(&caller("alice"), &id("resource"), AclRequest::SetInherit { enabled: false })
        .await
        .unwrap();
    assert!(!outcome.panels.inherit);
    assert!(outcome.panels.inherited.rows.is_empty());
    assert!(h.resolver.effective_parent_acl(&id("resource")).unwrap().is_none());

    h.session
        .apply(&caller("alice"), &id("resource"), AclRequest::SetInherit { enabled: true })
        .await
        .unwrap();
    let parent = h.resolver.effective_parent_acl(&id("resource")).unwrap().unwrap();
    assert_eq!(parent.resource, id("parent"));
}

#[tokio::test]
async fn test_set_inherit_on_root_rejected() {
    let h = TestHarness::new();
    let err = h
        .session
        .handle(&caller("alice"), &id("root"), json!({"op": "set_inherit", "enabled": false}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert!(h.service.read(&id("root")).unwrap().inherit);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_permission_set_rejected() {
    let h = TestHarness::new();
    let before = h.service.read(&id("resource")).unwrap();
    let err = h
        .session
        .handle(
            &caller("alice"),
            &id("resource"),
            json!({"op": "add", "verb": "Allow", "principal": "group:editors", "permissions": []}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.service.read(&id("resource")).unwrap(), before);
}

#[tokio::test]
async fn test_remove_out_of_range_is_index_error() {
    let h = TestHarness::new();
    let err = h
        .session
        .handle(&caller("alice"), &id("resource"), json!({"op": "remove", "index": 0}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Index { index: 0, len: 0 }));
}

#[tokio::test]
async fn test_unknown_op_is_bad_request() {
    let h = TestHarness::new();
    let err = h
        .session
        .handle(&caller("alice"), &id("resource"), json!({"op": "rename", "to": "x"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_acl_authorizer_gates_edits() {
    let seed = TestHarness::new();
    seed.service
        .add(
            &id("parent"),
            Verb::Allow,
            PrincipalId::new("group:admins"),
            vec![CHANGE_ACLS.into()],
        )
        .unwrap();
    let authorizer = AclAuthorizer::new(seed.resolver.clone());
    let session = fabryk_acl::EditSession::new(
        seed.resolver.clone(),
        Arc::new(authorizer),
        Arc::new(crate::common::directory()),
    );

    let admin = fabryk_acl::Caller::new(
        PrincipalId::new("bob"),
        vec![PrincipalId::new("group:admins")],
    );
    session
        .apply(&admin, &id("leaf"), AclRequest::SetInherit { enabled: false })
        .await
        .unwrap();

    let err = session
        .apply(&caller("alice"), &id("leaf"), AclRequest::SetInherit { enabled: true })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(!seed.service.read(&id("leaf")).unwrap().inherit);

    // Outside the granted subtree.
    let err = session
        .apply(&admin, &id("other"), AclRequest::SetInherit { enabled: false })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

// ============================================================================
// Audit
// ============================================================================

#[tokio::test]
async fn test_commits_are_audited_in_order() {
    let h = TestHarness::new();
    let alice = caller("alice");
    let first = h
        .session
        .handle(
            &alice,
            &id("resource"),
            json!({"op": "add", "verb": "Allow", "principal": "bob", "permissions": ["view"]}),
        )
        .await
        .unwrap();
    let second = h
        .session
        .handle(&alice, &id("other"), json!({"op": "set_inherit", "enabled": false}))
        .await
        .unwrap();
    // Boundary move: no audit entry.
    let noop = h
        .session
        .handle(&alice, &id("resource"), json!({"op": "move_up", "index": 0}))
        .await
        .unwrap();
    assert!(!noop.changed());

    let all = h.service.audit().newer(None, &[]);
    assert_eq!(all.len(), 2);
    assert_eq!(Some(all[0].0), second.audit_id);
    assert_eq!(Some(all[1].0), first.audit_id);
    assert!(all.iter().all(|(_, e)| e.name == ACL_MODIFIED));

    let only_resource = h.service.audit().newer(None, &[id("resource")]);
    assert_eq!(only_resource.len(), 1);
    assert_eq!(only_resource[0].1.payload["op"], "add");

    let after_first = h.service.audit().newer(first.audit_id, &[]);
    assert_eq!(after_first.len(), 1);
}
