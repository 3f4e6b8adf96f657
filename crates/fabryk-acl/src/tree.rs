//! Resource containment tree.
//!
//! The tree is owned outside the ACL engine; [`ResourceTree`] is the seam
//! through which the resolver and notifier walk it. [`MemoryTree`] is the
//! in-process implementation used by the server and tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use fabryk_core::ResourceId;

use crate::{Error, Result};

/// Read access to a strict resource tree (single parent, one root).
pub trait ResourceTree: Send + Sync {
    /// Returns `true` if the resource exists in the tree.
    fn contains(&self, id: &ResourceId) -> bool;

    /// Parent of `id`, or `None` for the root (and unknown resources).
    fn parent(&self, id: &ResourceId) -> Option<ResourceId>;

    /// Direct children of `id`, sorted.
    fn children(&self, id: &ResourceId) -> Vec<ResourceId>;

    /// Returns `true` if `id` is a root (present, no parent).
    fn is_root(&self, id: &ResourceId) -> bool {
        self.contains(id) && self.parent(id).is_none()
    }

    /// Ancestors of `id`, nearest first (parent, grandparent, ...).
    fn ancestors(&self, id: &ResourceId) -> Vec<ResourceId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == *id || chain.contains(&parent) {
                log::warn!("Cycle detected in resource tree above {id}");
                break;
            }
            current = self.parent(&parent);
            chain.push(parent);
        }
        chain
    }

    /// Returns `true` if `ancestor` lies strictly above `id`.
    fn is_ancestor(&self, ancestor: &ResourceId, id: &ResourceId) -> bool {
        self.ancestors(id).iter().any(|a| a == ancestor)
    }

    /// All descendants of `id` in breadth-first order.
    fn descendants(&self, id: &ResourceId) -> Vec<ResourceId> {
        let mut out = Vec::new();
        let mut queue = std::collections::VecDeque::from(self.children(id));
        while let Some(next) = queue.pop_front() {
            if out.contains(&next) {
                continue;
            }
            queue.extend(self.children(&next));
            out.push(next);
        }
        out
    }
}

#[derive(Default)]
struct TreeNodes {
    parents: HashMap<ResourceId, Option<ResourceId>>,
    children: HashMap<ResourceId, BTreeSet<ResourceId>>,
}

/// Thread-safe in-memory resource tree.
#[derive(Default)]
pub struct MemoryTree {
    nodes: RwLock<TreeNodes>,
}

impl MemoryTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root resource.
    pub fn insert_root(&self, id: ResourceId) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.parents.contains_key(&id) {
            return Err(Error::ResourceExists { id });
        }
        nodes.parents.insert(id, None);
        Ok(())
    }

    /// Adds `id` as a child of `parent`.
    pub fn insert(&self, id: ResourceId, parent: ResourceId) -> Result<()> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.parents.contains_key(&id) {
            return Err(Error::ResourceExists { id });
        }
        if !nodes.parents.contains_key(&parent) {
            return Err(Error::ResourceNotFound { id: parent });
        }
        nodes
            .children
            .entry(parent.clone())
            .or_default()
            .insert(id.clone());
        nodes.parents.insert(id, Some(parent));
        Ok(())
    }

    /// Removes `id` and its whole subtree; returns the removed ids,
    /// deepest last.
    pub fn remove(&self, id: &ResourceId) -> Result<Vec<ResourceId>> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let Some(parent) = nodes.parents.get(id).cloned() else {
            return Err(Error::ResourceNotFound { id: id.clone() });
        };
        if let Some(parent) = parent {
            if let Some(siblings) = nodes.children.get_mut(&parent) {
                siblings.remove(id);
            }
        }

        let mut removed = vec![id.clone()];
        let mut cursor = 0;
        while cursor < removed.len() {
            let current = removed[cursor].clone();
            if let Some(kids) = nodes.children.remove(&current) {
                removed.extend(kids);
            }
            cursor += 1;
        }
        for gone in &removed {
            nodes.parents.remove(gone);
        }
        Ok(removed)
    }

    /// Number of resources in the tree.
    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .parents
            .len()
    }

    /// Returns `true` if the tree has no resources.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceTree for MemoryTree {
    fn contains(&self, id: &ResourceId) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .parents
            .contains_key(id)
    }

    fn parent(&self, id: &ResourceId) -> Option<ResourceId> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .parents
            .get(id)
            .cloned()
            .flatten()
    }

    fn children(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .children
            .get(id)
            .map(|kids| kids.iter().cloned().collect())
            .unwrap_or_default()
    }
}
