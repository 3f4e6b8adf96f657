//! Principal directory and permission catalog collaborators.
//!
//! The ACL engine stores principals as opaque ids. Display names, search
//! and the list of offerable permission names come from outside through
//! these traits; the static implementations back the server's TOML
//! configuration and the tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use fabryk_core::PrincipalId;
use serde::Serialize;

/// A principal paired with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedPrincipal {
    /// Principal id.
    pub id: PrincipalId,
    /// Human-readable name.
    pub name: String,
}

/// Display names partitioned for presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrincipalNames {
    /// Groups, sorted by name.
    pub groups: Vec<NamedPrincipal>,
    /// Users, sorted by name.
    pub users: Vec<NamedPrincipal>,
}

impl PrincipalNames {
    /// Display name of `id`, if it was resolved.
    pub fn name_of(&self, id: &PrincipalId) -> Option<&str> {
        self.groups
            .iter()
            .chain(self.users.iter())
            .find(|p| &p.id == id)
            .map(|p| p.name.as_str())
    }
}

/// Resolves principal ids to names and searches for principals.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Names for `ids`, split into groups and users. Unknown ids are
    /// included with their id as name.
    async fn display_names(&self, ids: &[PrincipalId]) -> PrincipalNames;

    /// Principals whose id or name contains `query` (case-insensitive).
    async fn search(&self, query: &str) -> Vec<PrincipalId>;

    /// Returns `true` if `principal` names a known user or group.
    async fn resolves(&self, principal: &PrincipalId) -> bool;
}

/// Source of permission names offered when adding entries.
pub trait PermissionCatalog: Send + Sync {
    /// All offerable permission names.
    fn permissions(&self) -> BTreeSet<String>;
}

/// In-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: BTreeMap<PrincipalId, String>,
    groups: BTreeMap<PrincipalId, String>,
}

impl StaticDirectory {
    /// Creates an empty directory. `system.Everyone` always resolves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    pub fn with_user(mut self, id: impl Into<PrincipalId>, name: impl Into<String>) -> Self {
        self.users.insert(id.into(), name.into());
        self
    }

    /// Adds a group.
    pub fn with_group(mut self, id: impl Into<PrincipalId>, name: impl Into<String>) -> Self {
        self.groups.insert(id.into(), name.into());
        self
    }

    fn lookup(&self, id: &PrincipalId) -> Option<&str> {
        if id.is_everyone() {
            return Some("Everyone");
        }
        self.users
            .get(id)
            .or_else(|| self.groups.get(id))
            .map(String::as_str)
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn display_names(&self, ids: &[PrincipalId]) -> PrincipalNames {
        let mut names = PrincipalNames::default();
        for id in ids {
            let named = NamedPrincipal {
                id: id.clone(),
                name: self.lookup(id).unwrap_or(id.as_str()).to_string(),
            };
            if id.is_group() || id.is_everyone() || self.groups.contains_key(id) {
                names.groups.push(named);
            } else {
                names.users.push(named);
            }
        }
        names.groups.sort_by(|a, b| a.name.cmp(&b.name));
        names.users.sort_by(|a, b| a.name.cmp(&b.name));
        names
    }

    async fn search(&self, query: &str) -> Vec<PrincipalId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<PrincipalId> = self
            .groups
            .iter()
            .chain(self.users.iter())
            .filter(|(id, name)| {
                id.as_str().to_lowercase().contains(&needle)
                    || name.to_lowercase().contains(&needle)
            })
            .map(|(id, _)| id.clone())
            .collect();
        hits.sort();
        hits
    }

    async fn resolves(&self, principal: &PrincipalId) -> bool {
        self.lookup(principal).is_some()
    }
}

/// Fixed permission catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    permissions: BTreeSet<String>,
}

impl StaticCatalog {
    /// Creates a catalog from permission names.
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

impl PermissionCatalog for StaticCatalog {
    fn permissions(&self) -> BTreeSet<String> {
        self.permissions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        StaticDirectory::new()
            .with_user("alice", "Alice Liddell")
            .with_user("bob", "Bob Dobbs")
            .with_group("group:editors", "Editors")
    }

    #[tokio::test]
    async fn test_display_names_partitioned() {
        let dir = directory();
        let ids = vec![
            PrincipalId::new("bob"),
            PrincipalId::new("group:editors"),
            PrincipalId::new("alice"),
            PrincipalId::everyone(),
        ];
        let names = dir.display_names(&ids).await;
        let users: Vec<_> = names.users.iter().map(|p| p.name.as_str()).collect();
        let groups: Vec<_> = names.groups.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(users, vec!["Alice Liddell", "Bob Dobbs"]);
        assert_eq!(groups, vec!["Editors", "Everyone"]);
    }

    #[tokio::test]
    async fn test_unknown_principal_falls_back_to_id() {
        let names = directory()
            .display_names(&[PrincipalId::new("mallory")])
            .await;
        assert_eq!(names.name_of(&PrincipalId::new("mallory")), Some("mallory"));
    }

    #[tokio::test]
    async fn test_search_matches_id_and_name() {
        let dir = directory();
        assert_eq!(dir.search("EDIT").await, vec![PrincipalId::new("group:editors")]);
        assert_eq!(dir.search("dobbs").await, vec![PrincipalId::new("bob")]);
        assert!(dir.search("   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_resolves() {
        let dir = directory();
        assert!(dir.resolves(&PrincipalId::new("alice")).await);
        assert!(dir.resolves(&PrincipalId::everyone()).await);
        assert!(!dir.resolves(&PrincipalId::new("mallory")).await);
    }

    #[test]
    fn test_catalog_sorted() {
        let catalog = StaticCatalog::new(["view", "edit", "view"]);
        let perms: Vec<_> = catalog.permissions().into_iter().collect();
        assert_eq!(perms, vec!["edit", "view"]);
    }
}
