//! Access control entries.
//!
//! An [`Ace`] is an immutable `(verb, principal, permissions)` triple.
//! Edits never mutate an entry in place; the ACL replaces it with a newly
//! constructed one.

use std::collections::BTreeSet;
use std::fmt;

use fabryk_core::PrincipalId;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sentinel permission that matches every permission name.
pub const ALL_PERMISSIONS: &str = "system.all";

/// Whether an entry grants or refuses its permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    /// Grant the permissions.
    Allow,
    /// Refuse the permissions.
    Deny,
}

impl Verb {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Allow => "Allow",
            Verb::Deny => "Deny",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-empty set of permission names.
///
/// Names are trimmed and deduplicated; iteration and display are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Builds a permission set, rejecting empty sets and blank names.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabryk_acl::PermissionSet;
    ///
    /// let perms = PermissionSet::new(["view", "edit", "view"]).unwrap();
    /// assert_eq!(perms.to_string(), "edit, view");
    /// assert!(PermissionSet::new(Vec::<String>::new()).is_err());
    /// ```
    pub fn new<I, S>(permissions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for permission in permissions {
            let name = permission.as_ref().trim();
            if name.is_empty() {
                return Err(Error::validation_field(
                    "permissions",
                    "permission names must not be blank",
                ));
            }
            set.insert(name.to_string());
        }
        if set.is_empty() {
            return Err(Error::validation_field(
                "permissions",
                "permission set must not be empty",
            ));
        }
        Ok(Self(set))
    }

    /// Returns `true` if `permission` is covered by this set.
    pub fn grants(&self, permission: &str) -> bool {
        self.0.contains(ALL_PERMISSIONS) || self.0.contains(permission)
    }

    /// Sorted permission names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of distinct permission names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(", "))
    }
}

impl TryFrom<Vec<String>> for PermissionSet {
    type Error = Error;

    fn try_from(value: Vec<String>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PermissionSet> for Vec<String> {
    fn from(value: PermissionSet) -> Self {
        value.0.into_iter().collect()
    }
}

/// One access control entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AceRecord")]
pub struct Ace {
    verb: Verb,
    principal: PrincipalId,
    permissions: PermissionSet,
}

impl Ace {
    /// Constructs an entry, validating the principal.
    pub fn new(verb: Verb, principal: PrincipalId, permissions: PermissionSet) -> Result<Self> {
        if principal.as_str().trim().is_empty() {
            return Err(Error::validation_field(
                "principal",
                "principal must not be empty",
            ));
        }
        Ok(Self {
            verb,
            principal,
            permissions,
        })
    }

    /// Shorthand for an `Allow` entry from plain strings.
    pub fn allow<I, S>(principal: &str, permissions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            Verb::Allow,
            PrincipalId::new(principal),
            PermissionSet::new(permissions)?,
        )
    }

    /// Shorthand for a `Deny` entry from plain strings.
    pub fn deny<I, S>(principal: &str, permissions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            Verb::Deny,
            PrincipalId::new(principal),
            PermissionSet::new(permissions)?,
        )
    }

    /// Grant or refuse.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Principal this entry applies to.
    pub fn principal(&self) -> &PrincipalId {
        &self.principal
    }

    /// Permissions this entry covers.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns `true` if this entry decides `permission` for any of
    /// `principals`. `system.Everyone` entries match every caller.
    pub fn matches(&self, principals: &[PrincipalId], permission: &str) -> bool {
        let principal_matches =
            self.principal.is_everyone() || principals.iter().any(|p| p == &self.principal);
        principal_matches && self.permissions.grants(permission)
    }
}

impl fmt::Display for Ace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.verb, self.principal, self.permissions)
    }
}

#[derive(Deserialize)]
struct AceRecord {
    verb: Verb,
    principal: PrincipalId,
    permissions: PermissionSet,
}

impl TryFrom<AceRecord> for Ace {
    type Error = Error;

    fn try_from(record: AceRecord) -> Result<Self> {
        Ace::new(record.verb, record.principal, record.permissions)
    }
}
