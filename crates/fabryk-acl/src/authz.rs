//! Authorization collaborator for ACL management.
//!
//! The edit session asks an [`Authorizer`] whether the caller may manage a
//! resource's ACL before touching the store. [`AclAuthorizer`] answers
//! from the ACLs themselves; [`AllowAll`] is for tests and trusted tools.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use fabryk_core::{PrincipalId, ResourceId};

use crate::hierarchy::HierarchyResolver;

/// Permission required to edit a resource's ACL.
pub const CHANGE_ACLS: &str = "sdi.change-acls";

/// The identity on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    principal: PrincipalId,
    groups: Vec<PrincipalId>,
}

impl Caller {
    /// Creates a caller with its group memberships.
    pub fn new(principal: PrincipalId, groups: Vec<PrincipalId>) -> Self {
        Self { principal, groups }
    }

    /// Unauthenticated caller (`system.Everyone`).
    pub fn anonymous() -> Self {
        Self::new(PrincipalId::everyone(), Vec::new())
    }

    /// Primary principal.
    pub fn principal(&self) -> &PrincipalId {
        &self.principal
    }

    /// Group memberships.
    pub fn groups(&self) -> &[PrincipalId] {
        &self.groups
    }

    /// Every principal ACL entries may match: self, groups, Everyone.
    pub fn principals(&self) -> Vec<PrincipalId> {
        let mut all = Vec::with_capacity(self.groups.len() + 2);
        all.push(self.principal.clone());
        for group in &self.groups {
            if !all.contains(group) {
                all.push(group.clone());
            }
        }
        let everyone = PrincipalId::everyone();
        if !all.contains(&everyone) {
            all.push(everyone);
        }
        all
    }
}

/// Actions subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read or edit a resource's ACL.
    ManageAcl,
}

impl Action {
    /// Permission name checked for this action.
    pub fn permission(&self) -> &'static str {
        match self {
            Action::ManageAcl => CHANGE_ACLS,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ManageAcl => write!(f, "manage-acl"),
        }
    }
}

/// Decides whether a caller may perform an action on a resource.
///
/// Implementations must answer `false` for unknown resources rather than
/// failing, so refusals do not reveal whether a resource exists.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns `true` if `caller` may perform `action` on `resource`.
    async fn authorize(&self, caller: &Caller, resource: &ResourceId, action: Action) -> bool;
}

/// Grants superusers, otherwise checks the resource's effective ACL.
#[derive(Debug, Clone)]
pub struct AclAuthorizer {
    resolver: HierarchyResolver,
    superusers: BTreeSet<PrincipalId>,
}

impl AclAuthorizer {
    /// Creates an authorizer over `resolver`.
    pub fn new(resolver: HierarchyResolver) -> Self {
        Self {
            resolver,
            superusers: BTreeSet::new(),
        }
    }

    /// Principals that may always manage ACLs.
    pub fn with_superusers<I>(mut self, superusers: I) -> Self
    where
        I: IntoIterator<Item = PrincipalId>,
    {
        self.superusers.extend(superusers);
        self
    }
}

#[async_trait]
impl Authorizer for AclAuthorizer {
    async fn authorize(&self, caller: &Caller, resource: &ResourceId, action: Action) -> bool {
        if self.superusers.contains(caller.principal()) {
            return true;
        }
        match self
            .resolver
            .permits(resource, &caller.principals(), action.permission())
        {
            Ok(decision) => decision.is_allowed(),
            Err(e) => {
                log::debug!("Authorization of {} on {resource} failed: {e}", caller.principal());
                false
            }
        }
    }
}

/// Authorizes everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _caller: &Caller, _resource: &ResourceId, _action: Action) -> bool {
        true
    }
}
