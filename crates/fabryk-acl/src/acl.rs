//! Ordered access control lists.
//!
//! Order is significant: evaluation walks the list start to end and the
//! first entry matching the principal and permission decides. Duplicate
//! entries are allowed; the earlier one always wins.

use fabryk_core::PrincipalId;
use serde::{Deserialize, Serialize};

use crate::ace::{Ace, Verb};
use crate::{Error, Result};

/// An ordered sequence of [`Ace`]s for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl(Vec<Ace>);

impl Acl {
    /// Creates an empty ACL.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the ACL has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Ace> {
        self.0.get(index)
    }

    /// Entries in precedence order.
    pub fn iter(&self) -> std::slice::Iter<'_, Ace> {
        self.0.iter()
    }

    /// Entries as a slice.
    pub fn as_slice(&self) -> &[Ace] {
        &self.0
    }

    /// Appends an entry at the end (lowest precedence).
    pub fn push(&mut self, ace: Ace) {
        self.0.push(ace);
    }

    /// Removes and returns the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Ace> {
        self.check_index(index)?;
        Ok(self.0.remove(index))
    }

    /// Swaps the entry at `index` with its predecessor.
    ///
    /// Returns `false` without changing anything when `index` is 0.
    pub fn move_up(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        if index == 0 {
            return Ok(false);
        }
        self.0.swap(index - 1, index);
        Ok(true)
    }

    /// Swaps the entry at `index` with its successor.
    ///
    /// Returns `false` without changing anything when `index` is the last
    /// entry.
    pub fn move_down(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        if index + 1 == self.0.len() {
            return Ok(false);
        }
        self.0.swap(index, index + 1);
        Ok(true)
    }

    /// First entry deciding `permission` for any of `principals`.
    pub fn first_match(&self, principals: &[PrincipalId], permission: &str) -> Option<&Ace> {
        self.0.iter().find(|ace| ace.matches(principals, permission))
    }

    /// First-match decision: `Some(Allow | Deny)` or `None` if no entry
    /// applies.
    pub fn decide(&self, principals: &[PrincipalId], permission: &str) -> Option<Verb> {
        self.first_match(principals, permission).map(Ace::verb)
    }

    /// Distinct principals named by the entries, in first-seen order.
    pub fn principals(&self) -> Vec<PrincipalId> {
        let mut seen = Vec::new();
        for ace in &self.0 {
            if !seen.contains(ace.principal()) {
                seen.push(ace.principal().clone());
            }
        }
        seen
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.0.len() {
            return Err(Error::Index {
                index,
                len: self.0.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<Ace>> for Acl {
    fn from(entries: Vec<Ace>) -> Self {
        Self(entries)
    }
}

impl FromIterator<Ace> for Acl {
    fn from_iter<T: IntoIterator<Item = Ace>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Acl {
    type Item = &'a Ace;
    type IntoIter = std::slice::Iter<'a, Ace>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Point-in-time view of one resource's ACL state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSnapshot {
    /// Own entries in precedence order.
    pub acl: Acl,
    /// Whether the resource falls back to its ancestors' ACLs.
    pub inherit: bool,
}

impl Default for AclSnapshot {
    fn default() -> Self {
        Self {
            acl: Acl::new(),
            inherit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Acl {
        Acl::from(vec![
            Ace::allow("alice", ["view"]).unwrap(),
            Ace::deny("bob", ["view"]).unwrap(),
            Ace::allow("carol", ["edit"]).unwrap(),
        ])
    }

    fn names(acl: &Acl) -> Vec<&str> {
        acl.iter().map(|a| a.principal().as_str()).collect()
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut acl = sample();
        let removed = acl.remove(1).unwrap();
        assert_eq!(removed.principal().as_str(), "bob");
        assert_eq!(names(&acl), vec!["alice", "carol"]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut acl = sample();
        let err = acl.remove(3).unwrap_err();
        assert!(matches!(err, Error::Index { index: 3, len: 3 }));
        assert_eq!(acl, sample());
    }

    #[test]
    fn test_move_up_boundary_is_noop() {
        let mut acl = sample();
        assert!(!acl.move_up(0).unwrap());
        assert_eq!(acl, sample());
    }

    #[test]
    fn test_move_down_boundary_is_noop() {
        let mut acl = sample();
        assert!(!acl.move_down(2).unwrap());
        assert_eq!(acl, sample());
    }

    #[test]
    fn test_move_up_swaps() {
        let mut acl = sample();
        assert!(acl.move_up(2).unwrap());
        assert_eq!(names(&acl), vec!["alice", "carol", "bob"]);
    }

    #[test]
    fn test_move_out_of_range() {
        let mut acl = sample();
        assert!(acl.move_up(7).is_err());
        assert!(acl.move_down(3).is_err());
        let mut empty = Acl::new();
        assert!(empty.move_down(0).is_err());
    }

    #[test]
    fn test_first_match_precedence() {
        let acl = Acl::from(vec![
            Ace::deny("alice", ["edit"]).unwrap(),
            Ace::allow("alice", ["edit", "view"]).unwrap(),
        ]);
        let alice = [PrincipalId::new("alice")];
        assert_eq!(acl.decide(&alice, "edit"), Some(Verb::Deny));
        assert_eq!(acl.decide(&alice, "view"), Some(Verb::Allow));
        assert_eq!(acl.decide(&alice, "delete"), None);
    }

    #[test]
    fn test_reorder_changes_decision() {
        let mut acl = Acl::from(vec![
            Ace::deny("alice", ["edit"]).unwrap(),
            Ace::allow("alice", ["edit"]).unwrap(),
        ]);
        let alice = [PrincipalId::new("alice")];
        assert_eq!(acl.decide(&alice, "edit"), Some(Verb::Deny));
        acl.move_down(0).unwrap();
        assert_eq!(acl.decide(&alice, "edit"), Some(Verb::Allow));
    }

    #[test]
    fn test_principals_deduplicated() {
        let mut acl = sample();
        acl.push(Ace::allow("alice", ["edit"]).unwrap());
        let principals = acl.principals();
        assert_eq!(principals.len(), 3);
        assert_eq!(principals[0].as_str(), "alice");
    }

    #[test]
    fn test_snapshot_default_inherits() {
        let snap = AclSnapshot::default();
        assert!(snap.inherit);
        assert!(snap.acl.is_empty());
    }
}
