//! # fabryk-acl
//!
//! Editable access control lists for a hierarchical resource tree.
//!
//! This crate implements the ACL engine for Fabryk:
//! - Ordered ACEs with first-match precedence ([`Acl`], [`Ace`])
//! - Per-resource, independently locked storage ([`AclService`])
//! - Inheritance resolution and bulk-effect counts ([`HierarchyResolver`])
//! - Change notification keyed by resource ([`ChangeNotifier`])
//! - Audit history of committed changes ([`AuditLog`])
//! - The edit request state machine ([`EditSession`])
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fabryk_acl::{AclService, HierarchyResolver, MemoryTree, Verb};
//! use fabryk_core::{PrincipalId, ResourceId};
//!
//! let tree = MemoryTree::new();
//! let root = ResourceId::new("root");
//! let docs = ResourceId::new("docs");
//! tree.insert_root(root.clone()).unwrap();
//! tree.insert(docs.clone(), root.clone()).unwrap();
//!
//! let service = Arc::new(AclService::in_memory(Arc::new(tree)));
//! service.create(&root).unwrap();
//! service.create(&docs).unwrap();
//! service
//!     .add(&root, Verb::Deny, PrincipalId::new("alice"), vec!["view".into()])
//!     .unwrap();
//!
//! let resolver = HierarchyResolver::new(service);
//! let parent = resolver.effective_parent_acl(&docs).unwrap().unwrap();
//! assert_eq!(parent.resource, root);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod ace;
pub mod acl;
pub mod audit;
pub mod authz;
pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod notifier;
pub mod render;
pub mod request;
pub mod session;
pub mod store;
pub mod tree;

pub use ace::{Ace, PermissionSet, Verb, ALL_PERMISSIONS};
pub use acl::{Acl, AclSnapshot};
pub use audit::{AppendStack, AuditEntry, AuditId, AuditLog};
pub use authz::{AclAuthorizer, Action, AllowAll, Authorizer, Caller, CHANGE_ACLS};
pub use directory::{
    Directory, NamedPrincipal, PermissionCatalog, PrincipalNames, StaticCatalog, StaticDirectory,
};
pub use error::{Error, ErrorKind, Result};
pub use hierarchy::{Decision, EffectiveAce, HierarchyResolver, ParentAcl};
pub use notifier::{AclEvent, ChangeNotifier, EventKind, Subscription, ACL_MODIFIED};
pub use render::{AceRow, AclPanels, InheritedPanel, PanelRenderer};
pub use request::AclRequest;
pub use session::{EditOutcome, EditSession, SessionPhase};
pub use store::{AclService, Commit};
pub use tree::{MemoryTree, ResourceTree};

mod proptests;
