//! Edit session handling.
//!
//! Every mutation request runs the same state machine:
//!
//! ```text
//! Received ──parse──▶ Authorizing ──authorize──▶ Applying ──store──▶ Committed
//!    │                     │                        │
//!    └─ BadRequest         └─ Forbidden             └─ Validation / Index /
//!                                                      InvalidOperation
//! ```
//!
//! Each failure is terminal and leaves the ACL untouched. On commit the
//! store has already published the change event; the session returns the
//! refreshed panels.

use std::fmt;
use std::sync::Arc;

use fabryk_core::ResourceId;

use crate::audit::AuditId;
use crate::authz::{Action, Authorizer, Caller};
use crate::directory::Directory;
use crate::hierarchy::HierarchyResolver;
use crate::render::{AclPanels, PanelRenderer};
use crate::request::AclRequest;
use crate::{Error, Result};

/// Phases of a mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Request arrived; shape not yet checked.
    Received,
    /// Shape valid; checking the caller.
    Authorizing,
    /// Caller authorized; handing off to the store.
    Applying,
    /// Store accepted the mutation.
    Committed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Received => "received",
            SessionPhase::Authorizing => "authorizing",
            SessionPhase::Applying => "applying",
            SessionPhase::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// Result of a committed edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Panels rendered from the committed state.
    pub panels: AclPanels,
    /// Audit entry of the change; `None` when the edit was a no-op.
    pub audit_id: Option<AuditId>,
}

impl EditOutcome {
    /// Returns `true` if the edit changed state.
    pub fn changed(&self) -> bool {
        self.audit_id.is_some()
    }
}

/// Entry point for ACL reads and edits on behalf of a caller.
#[derive(Clone)]
pub struct EditSession {
    resolver: HierarchyResolver,
    authorizer: Arc<dyn Authorizer>,
    directory: Arc<dyn Directory>,
    renderer: PanelRenderer,
}

impl EditSession {
    /// Creates a session handler.
    pub fn new(
        resolver: HierarchyResolver,
        authorizer: Arc<dyn Authorizer>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        let renderer = PanelRenderer::new(Arc::clone(&directory));
        Self {
            resolver,
            authorizer,
            directory,
            renderer,
        }
    }

    /// The resolver backing this session.
    pub fn resolver(&self) -> &HierarchyResolver {
        &self.resolver
    }

    /// Handles a raw JSON mutation request.
    pub async fn handle(
        &self,
        caller: &Caller,
        resource: &ResourceId,
        body: serde_json::Value,
    ) -> Result<EditOutcome> {
        trace(resource, SessionPhase::Received);
        let request = AclRequest::from_json(body)?;
        self.apply(caller, resource, request).await
    }

    /// Handles an already-parsed mutation request.
    pub async fn apply(
        &self,
        caller: &Caller,
        resource: &ResourceId,
        request: AclRequest,
    ) -> Result<EditOutcome> {
        trace(resource, SessionPhase::Authorizing);
        self.authorize(caller, resource).await?;

        trace(resource, SessionPhase::Applying);
        self.check_principal(&request).await?;
        let commit = self.resolver.service().apply(resource, &request)?;

        trace(resource, SessionPhase::Committed);
        let service = self.resolver.service();
        let is_root = service.tree().is_root(resource);
        let parent = self.resolver.parent_acl_with(resource, &commit.snapshot);
        let panels = self
            .renderer
            .render(resource, &commit.snapshot, parent.as_ref(), is_root)
            .await;
        Ok(EditOutcome {
            panels,
            audit_id: commit.audit_id,
        })
    }

    /// Current panels of `resource`.
    pub async fn view(&self, caller: &Caller, resource: &ResourceId) -> Result<AclPanels> {
        self.authorize(caller, resource).await?;
        self.render(resource).await
    }

    /// Descendants affected by `request`, without applying it.
    pub async fn pathcount(
        &self,
        caller: &Caller,
        resource: &ResourceId,
        request: &AclRequest,
    ) -> Result<usize> {
        self.authorize(caller, resource).await?;
        self.resolver.pathcount(resource, request)
    }

    async fn render(&self, resource: &ResourceId) -> Result<AclPanels> {
        let service = self.resolver.service();
        let snapshot = service.read(resource)?;
        let parent = self.resolver.parent_acl_with(resource, &snapshot);
        let is_root = service.tree().is_root(resource);
        Ok(self
            .renderer
            .render(resource, &snapshot, parent.as_ref(), is_root)
            .await)
    }

    /// Fails with `Forbidden` unless `caller` may manage `resource`'s ACL.
    pub async fn authorize(&self, caller: &Caller, resource: &ResourceId) -> Result<()> {
        if self
            .authorizer
            .authorize(caller, resource, Action::ManageAcl)
            .await
        {
            return Ok(());
        }
        log::warn!(
            "Refused {} to {} on {resource}",
            Action::ManageAcl,
            caller.principal()
        );
        Err(Error::Forbidden {
            principal: caller.principal().clone(),
            resource: resource.clone(),
        })
    }

    async fn check_principal(&self, request: &AclRequest) -> Result<()> {
        let AclRequest::Add { principal, .. } = request else {
            return Ok(());
        };
        // Empty ids are rejected by the store with a more specific message.
        if principal.as_str().trim().is_empty() || self.directory.resolves(principal).await {
            return Ok(());
        }
        Err(Error::validation_field(
            "principal",
            format!("unknown principal: {principal}"),
        ))
    }
}

impl fmt::Debug for EditSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

fn trace(resource: &ResourceId, phase: SessionPhase) {
    log::debug!("ACL edit on {resource}: {phase}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::AllowAll;
    use crate::directory::StaticDirectory;
    use crate::store::AclService;
    use crate::tree::MemoryTree;
    use fabryk_core::PrincipalId;
    use serde_json::json;

    struct DenyAll;

    #[async_trait::async_trait]
    impl Authorizer for DenyAll {
        async fn authorize(&self, _: &Caller, _: &ResourceId, _: Action) -> bool {
            false
        }
    }

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s)
    }

    fn session(authorizer: Arc<dyn Authorizer>) -> EditSession {
        let tree = MemoryTree::new();
        tree.insert_root(id("root")).unwrap();
        tree.insert(id("docs"), id("root")).unwrap();
        let service = AclService::in_memory(Arc::new(tree));
        service.create(&id("root")).unwrap();
        service.create(&id("docs")).unwrap();
        let directory = StaticDirectory::new()
            .with_user("alice", "Alice")
            .with_group("group:editors", "Editors");
        EditSession::new(
            HierarchyResolver::new(Arc::new(service)),
            authorizer,
            Arc::new(directory),
        )
    }

    fn caller() -> Caller {
        Caller::new(PrincipalId::new("alice"), vec![])
    }

    #[tokio::test]
    async fn test_handle_commits_and_renders() {
        let session = session(Arc::new(AllowAll));
        let outcome = session
            .handle(
                &caller(),
                &id("docs"),
                json!({"op": "add", "verb": "Allow", "principal": "alice", "permissions": ["view"]}),
            )
            .await
            .unwrap();
        assert!(outcome.changed());
        assert_eq!(outcome.panels.local.len(), 1);
        assert_eq!(outcome.panels.local[0].display_name, "Alice");
    }

    #[tokio::test]
    async fn test_bad_request_before_authorization() {
        let session = session(Arc::new(DenyAll));
        let err = session
            .handle(&caller(), &id("docs"), json!({"op": "add"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_forbidden_leaves_state() {
        let session = session(Arc::new(DenyAll));
        let err = session
            .apply(&caller(), &id("docs"), AclRequest::SetInherit { enabled: false })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
        assert!(session.resolver().service().read(&id("docs")).unwrap().inherit);
        assert!(session.view(&caller(), &id("docs")).await.is_err());
    }

    #[tokio::test]
    async fn test_unresolved_principal_is_validation_error() {
        let session = session(Arc::new(AllowAll));
        let err = session
            .handle(
                &caller(),
                &id("docs"),
                json!({"op": "add", "verb": "Allow", "principal": "mallory", "permissions": ["view"]}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "principal"));
        assert!(session.resolver().service().read(&id("docs")).unwrap().acl.is_empty());
    }

    #[tokio::test]
    async fn test_view_shows_inherited_panel() {
        let session = session(Arc::new(AllowAll));
        session
            .apply(
                &caller(),
                &id("root"),
                AclRequest::Add {
                    verb: crate::ace::Verb::Deny,
                    principal: PrincipalId::new("group:editors"),
                    permissions: vec!["edit".into()],
                },
            )
            .await
            .unwrap();
        let panels = session.view(&caller(), &id("docs")).await.unwrap();
        assert_eq!(panels.inherited.source, Some(id("root")));
        assert!(!panels.is_root);
        let root = session.view(&caller(), &id("root")).await.unwrap();
        assert!(root.is_root);
        assert!(root.inherited.rows.is_empty());
    }

    #[tokio::test]
    async fn test_pathcount_requires_authorization() {
        let session = session(Arc::new(DenyAll));
        let err = session
            .pathcount(&caller(), &id("root"), &AclRequest::Remove { index: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SessionPhase::Authorizing.to_string(), "authorizing");
    }
}
