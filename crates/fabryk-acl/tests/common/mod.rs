//! Common test utilities and harness for fabryk-acl integration tests.

use std::sync::Arc;

use fabryk_acl::{
    AclService, AllowAll, Authorizer, Caller, EditSession, HierarchyResolver, MemoryTree,
    StaticDirectory,
};
use fabryk_core::{PrincipalId, ResourceId};

/// Test harness wiring a full ACL stack over a fixed tree:
///
/// ```text
/// root
/// ├── parent
/// │   ├── resource
/// │   │   └── leaf
/// │   └── sibling
/// └── other
/// ```
pub struct TestHarness {
    /// Shared store.
    pub service: Arc<AclService>,
    /// Resolver over the store.
    pub resolver: HierarchyResolver,
    /// Session handler (authorizes everything unless overridden).
    pub session: EditSession,
}

impl TestHarness {
    /// Creates a harness whose session authorizes every caller.
    pub fn new() -> Self {
        Self::with_authorizer(Arc::new(AllowAll))
    }

    /// Creates a harness with a custom authorizer.
    pub fn with_authorizer(authorizer: Arc<dyn Authorizer>) -> Self {
        let tree = MemoryTree::new();
        tree.insert_root(id("root")).unwrap();
        for (child, parent) in [
            ("parent", "root"),
            ("other", "root"),
            ("resource", "parent"),
            ("sibling", "parent"),
            ("leaf", "resource"),
        ] {
            tree.insert(id(child), id(parent)).unwrap();
        }

        let service = Arc::new(AclService::in_memory(Arc::new(tree)));
        for r in ["root", "parent", "other", "resource", "sibling", "leaf"] {
            service.create(&id(r)).unwrap();
        }
        let resolver = HierarchyResolver::new(Arc::clone(&service));
        let session = EditSession::new(resolver.clone(), authorizer, Arc::new(directory()));
        Self {
            service,
            resolver,
            session,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory knowing the principals used across the suite.
pub fn directory() -> StaticDirectory {
    StaticDirectory::new()
        .with_user("alice", "Alice")
        .with_user("bob", "Bob")
        .with_group("group:editors", "Editors")
        .with_group("group:admins", "Administrators")
}

/// Shorthand for a resource id.
pub fn id(s: &str) -> ResourceId {
    ResourceId::new(s)
}

/// A caller with no group memberships.
pub fn caller(name: &str) -> Caller {
    Caller::new(PrincipalId::new(name), Vec::new())
}
