//! Inheritance resolution over the resource tree.
//!
//! Two distinct questions are answered here:
//!
//! - [`HierarchyResolver::effective_parent_acl`]: the read-only "inherited"
//!   panel. Gated solely by the requesting resource's own flag; the nearest
//!   ancestor holding entries is returned as-is.
//! - [`HierarchyResolver::effective_acl`]: the full precedence chain used
//!   for decisions. Own entries first, then the parent's effective ACL,
//!   each level gated by its own flag.
//!
//! Nothing is cached; every call reads the latest committed state.

use std::collections::VecDeque;
use std::sync::Arc;

use fabryk_core::{PrincipalId, ResourceId};
use serde::Serialize;

use crate::ace::{Ace, Verb};
use crate::acl::{Acl, AclSnapshot};
use crate::request::AclRequest;
use crate::store::AclService;
use crate::Result;

/// The ACL shown as inherited, with the ancestor it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentAcl {
    /// Ancestor owning the entries.
    pub resource: ResourceId,
    /// That ancestor's own entries, unchanged.
    pub acl: Acl,
}

/// One entry of an effective ACL, tagged with the resource it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveAce {
    /// Resource whose ACL holds the entry.
    pub source: ResourceId,
    /// The entry.
    pub ace: Ace,
}

/// First-match outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// An Allow entry matched first.
    Allowed {
        /// Resource holding the deciding entry.
        source: ResourceId,
    },
    /// A Deny entry matched first.
    Denied {
        /// Resource holding the deciding entry.
        source: ResourceId,
    },
    /// No entry matched.
    NoMatch,
}

impl Decision {
    /// Returns `true` only for [`Decision::Allowed`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Resolves inherited and effective ACLs against an [`AclService`].
#[derive(Debug, Clone)]
pub struct HierarchyResolver {
    service: Arc<AclService>,
}

impl HierarchyResolver {
    /// Creates a resolver reading from `service`.
    pub fn new(service: Arc<AclService>) -> Self {
        Self { service }
    }

    /// The service this resolver reads from.
    pub fn service(&self) -> &Arc<AclService> {
        &self.service
    }

    /// Nearest ancestor ACL with entries, if `resource` inherits.
    ///
    /// `None` for the root, for resources with inheritance disabled, and
    /// when no ancestor holds any entries.
    pub fn effective_parent_acl(&self, resource: &ResourceId) -> Result<Option<ParentAcl>> {
        let own = self.service.read(resource)?;
        Ok(self.parent_acl_with(resource, &own))
    }

    /// Like [`effective_parent_acl`](Self::effective_parent_acl) for an
    /// already-read snapshot of `resource`.
    pub fn parent_acl_with(&self, resource: &ResourceId, own: &AclSnapshot) -> Option<ParentAcl> {
        let tree = self.service.tree();
        if tree.is_root(resource) || !own.inherit {
            return None;
        }
        tree.ancestors(resource).into_iter().find_map(|ancestor| {
            let snapshot = self.service.snapshot_of(&ancestor)?;
            (!snapshot.acl.is_empty()).then_some(ParentAcl {
                resource: ancestor,
                acl: snapshot.acl,
            })
        })
    }

    /// Own entries followed by each inherited level, in precedence order.
    pub fn effective_acl(&self, resource: &ResourceId) -> Result<Vec<EffectiveAce>> {
        let own = self.service.read(resource)?;
        Ok(self.effective_with(resource, &own))
    }

    fn effective_with(&self, resource: &ResourceId, own: &AclSnapshot) -> Vec<EffectiveAce> {
        let tree = self.service.tree();
        let mut chain: Vec<EffectiveAce> = tag(resource, &own.acl);
        let mut inherit = own.inherit;
        let mut current = resource.clone();
        let mut visited = vec![resource.clone()];

        while inherit {
            let Some(parent) = tree.parent(&current) else {
                break;
            };
            if visited.contains(&parent) {
                log::warn!("Cycle detected in resource tree above {resource}");
                break;
            }
            let snapshot = self.service.snapshot_of(&parent).unwrap_or_default();
            chain.extend(tag(&parent, &snapshot.acl));
            inherit = snapshot.inherit;
            visited.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// First-match check of `permission` for any of `principals`.
    pub fn permits(
        &self,
        resource: &ResourceId,
        principals: &[PrincipalId],
        permission: &str,
    ) -> Result<Decision> {
        let chain = self.effective_acl(resource)?;
        let decision = chain
            .into_iter()
            .find(|entry| entry.ace.matches(principals, permission))
            .map_or(Decision::NoMatch, |entry| match entry.ace.verb() {
                Verb::Allow => Decision::Allowed {
                    source: entry.source,
                },
                Verb::Deny => Decision::Denied {
                    source: entry.source,
                },
            });
        log::trace!("{permission} on {resource}: {decision:?}");
        Ok(decision)
    }

    /// Number of descendants whose effective ACL would change if
    /// `request` were applied to `resource`.
    ///
    /// Runs the mutation against a scratch copy; nothing is committed.
    /// Errors the mutation itself would raise are returned unchanged.
    pub fn pathcount(&self, resource: &ResourceId, request: &AclRequest) -> Result<usize> {
        let tree = self.service.tree();
        let current = self.service.read(resource)?;
        let mut proposed = current.clone();
        if !request.apply_to(&mut proposed, tree.is_root(resource))? {
            return Ok(0);
        }
        if self.effective_with(resource, &current) == self.effective_with(resource, &proposed) {
            return Ok(0);
        }

        let mut count = 0;
        let mut queue = VecDeque::from(tree.children(resource));
        let mut seen = Vec::new();
        while let Some(child) = queue.pop_front() {
            if seen.contains(&child) {
                continue;
            }
            let inherits = self
                .service
                .snapshot_of(&child)
                .is_none_or(|snapshot| snapshot.inherit);
            if inherits {
                count += 1;
                queue.extend(tree.children(&child));
            }
            seen.push(child);
        }
        log::debug!("{} on {resource} affects {count} descendant(s)", request.op());
        Ok(count)
    }
}

fn tag(source: &ResourceId, acl: &Acl) -> Vec<EffectiveAce> {
    acl.iter()
        .map(|ace| EffectiveAce {
            source: source.clone(),
            ace: ace.clone(),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
