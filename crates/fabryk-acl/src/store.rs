//! Per-resource ACL storage.
//!
//! Each resource owns one [`ResourceAcl`] behind its own `RwLock`; the
//! outer map is only locked long enough to look a store up, so mutations
//! on different resources never contend. A mutation validates and applies
//! under the resource's write lock, records an audit entry before the lock
//! is released, and publishes its change event afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use fabryk_core::{PrincipalId, ResourceId};

use crate::ace::Verb;
use crate::acl::AclSnapshot;
use crate::audit::{AuditId, AuditLog};
use crate::notifier::{ACL_MODIFIED, AclEvent, ChangeNotifier};
use crate::request::AclRequest;
use crate::tree::ResourceTree;
use crate::{Error, Result};

/// The lockable ACL state of a single resource.
#[derive(Debug, Default)]
pub struct ResourceAcl {
    state: RwLock<AclSnapshot>,
}

impl ResourceAcl {
    fn new(snapshot: AclSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    fn snapshot(&self) -> AclSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Outcome of a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// State immediately after the mutation.
    pub snapshot: AclSnapshot,
    /// Audit entry recorded for the change; `None` for no-op moves.
    pub audit_id: Option<AuditId>,
}

impl Commit {
    /// Returns `true` if the mutation changed state (and was published).
    pub fn changed(&self) -> bool {
        self.audit_id.is_some()
    }
}

/// Owns every resource's ACL and routes mutations through the audit log
/// and change notifier.
pub struct AclService {
    tree: Arc<dyn ResourceTree>,
    stores: RwLock<HashMap<ResourceId, Arc<ResourceAcl>>>,
    notifier: ChangeNotifier,
    audit: Arc<AuditLog>,
}

impl AclService {
    /// Creates an empty service over `tree`.
    pub fn new(tree: Arc<dyn ResourceTree>, notifier: ChangeNotifier, audit: Arc<AuditLog>) -> Self {
        Self {
            tree,
            stores: RwLock::new(HashMap::new()),
            notifier,
            audit,
        }
    }

    /// Creates a service with a default notifier and audit log.
    pub fn in_memory(tree: Arc<dyn ResourceTree>) -> Self {
        let notifier = ChangeNotifier::new(
            Arc::clone(&tree),
            crate::notifier::DEFAULT_SUBSCRIBER_BUFFER,
        );
        Self::new(tree, notifier, Arc::new(AuditLog::default()))
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Registers an empty ACL (inheritance enabled) for a new resource.
    pub fn create(&self, resource: &ResourceId) -> Result<()> {
        self.insert(resource, AclSnapshot::default())?;
        log::debug!("Created ACL for {resource}");
        Ok(())
    }

    /// Registers a pre-built ACL, e.g. from bootstrap configuration.
    pub fn seed(&self, resource: &ResourceId, snapshot: AclSnapshot) -> Result<()> {
        let entries = snapshot.acl.len();
        self.insert(resource, snapshot)?;
        log::debug!("Seeded ACL for {resource} with {entries} entries");
        Ok(())
    }

    fn insert(&self, resource: &ResourceId, snapshot: AclSnapshot) -> Result<()> {
        if !self.tree.contains(resource) {
            return Err(Error::ResourceNotFound {
                id: resource.clone(),
            });
        }
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        if stores.contains_key(resource) {
            return Err(Error::ResourceExists {
                id: resource.clone(),
            });
        }
        stores.insert(resource.clone(), Arc::new(ResourceAcl::new(snapshot)));
        Ok(())
    }

    /// Drops the ACL of `resource` and of its descendants.
    ///
    /// Stores whose resources have already left the tree are dropped too,
    /// and subscriptions watching only removed resources are released.
    /// Returns the number of stores removed.
    pub fn destroy(&self, resource: &ResourceId) -> Result<usize> {
        let mut doomed = self.tree.descendants(resource);
        doomed.push(resource.clone());

        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        if !stores.contains_key(resource) {
            return Err(Error::ResourceNotFound {
                id: resource.clone(),
            });
        }
        let removed: Vec<ResourceId> = stores
            .keys()
            .filter(|id| doomed.contains(id) || !self.tree.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            stores.remove(id);
        }
        drop(stores);

        self.notifier.release_resources(&removed);
        log::debug!("Destroyed {} ACL(s) rooted at {resource}", removed.len());
        Ok(removed.len())
    }

    /// Returns `true` if an ACL is registered for `resource`.
    pub fn contains(&self, resource: &ResourceId) -> bool {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(resource)
    }

    /// Registered resources, sorted.
    pub fn resources(&self) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Current entries and inheritance flag of `resource`.
    pub fn read(&self, resource: &ResourceId) -> Result<AclSnapshot> {
        Ok(self.store(resource)?.snapshot())
    }

    /// Like [`read`](Self::read) but `None` for unregistered resources.
    pub fn snapshot_of(&self, resource: &ResourceId) -> Option<AclSnapshot> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(resource)
            .map(|store| store.snapshot())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Appends an entry.
    pub fn add(
        &self,
        resource: &ResourceId,
        verb: Verb,
        principal: PrincipalId,
        permissions: Vec<String>,
    ) -> Result<Commit> {
        self.apply(
            resource,
            &AclRequest::Add {
                verb,
                principal,
                permissions,
            },
        )
    }

    /// Deletes the entry at `index`.
    pub fn remove(&self, resource: &ResourceId, index: usize) -> Result<Commit> {
        self.apply(resource, &AclRequest::Remove { index })
    }

    /// Swaps the entry at `index` with its predecessor.
    pub fn move_up(&self, resource: &ResourceId, index: usize) -> Result<Commit> {
        self.apply(resource, &AclRequest::MoveUp { index })
    }

    /// Swaps the entry at `index` with its successor.
    pub fn move_down(&self, resource: &ResourceId, index: usize) -> Result<Commit> {
        self.apply(resource, &AclRequest::MoveDown { index })
    }

    /// Sets the inheritance flag. Fails on the root resource.
    pub fn set_inherit(&self, resource: &ResourceId, enabled: bool) -> Result<Commit> {
        self.apply(resource, &AclRequest::SetInherit { enabled })
    }

    /// Applies `request` atomically to `resource`'s ACL.
    pub fn apply(&self, resource: &ResourceId, request: &AclRequest) -> Result<Commit> {
        let store = self.store(resource)?;
        let is_root = self.tree.is_root(resource);

        let commit = {
            let mut state = store.state.write().unwrap_or_else(PoisonError::into_inner);
            let changed = request.apply_to(&mut state, is_root)?;
            let audit_id = changed
                .then(|| self.audit.add(ACL_MODIFIED, resource.clone(), request.audit_payload()));
            Commit {
                snapshot: state.clone(),
                audit_id,
            }
        };

        match commit.audit_id {
            Some(id) => {
                let delivered = self
                    .notifier
                    .publish(AclEvent::modified(resource.clone(), Some(id)));
                log::info!(
                    "ACL of {resource} modified by {} (audit {id}, {delivered} subscriber(s) notified)",
                    request.op()
                );
            }
            None => log::debug!("{} on {resource} left the ACL unchanged", request.op()),
        }
        Ok(commit)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Resource tree the service resolves against.
    pub fn tree(&self) -> &Arc<dyn ResourceTree> {
        &self.tree
    }

    /// Change notifier mutations publish to.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Audit log mutations append to.
    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    fn store(&self, resource: &ResourceId) -> Result<Arc<ResourceAcl>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(resource)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound {
                id: resource.clone(),
            })
    }
}

impl fmt::Debug for AclService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AclService")
            .field("resources", &self.resources().len())
            .field("notifier", &self.notifier)
            .field("audit", &self.audit)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
