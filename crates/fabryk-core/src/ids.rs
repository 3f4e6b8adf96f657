//! Identifier types for resources and principals.
//!
//! Both identifiers are opaque strings. Resource ids name a node in the
//! externally managed resource tree; principal ids name a user or a group
//! (groups carry the `group:` prefix).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Prefix that marks a principal id as a group.
pub const GROUP_PREFIX: &str = "group:";

/// Identifier of a resource in the resource tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a resource id without validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabryk_core::ResourceId;
    ///
    /// let id = ResourceId::new("reports");
    /// assert_eq!(id.as_str(), "reports");
    /// ```
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Parses a resource id from untrusted input.
    ///
    /// Surrounding whitespace is trimmed; an empty result is rejected.
    pub fn parse(id: &str) -> Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_id("resource id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the resource id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a user or group subject to access rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Pseudo-principal matching every caller.
    pub const EVERYONE: &'static str = "system.Everyone";

    /// Creates a principal id without validation.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Parses a principal id from untrusted input.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabryk_core::PrincipalId;
    ///
    /// let id = PrincipalId::parse(" group:editors ").unwrap();
    /// assert!(id.is_group());
    /// assert!(PrincipalId::parse("  ").is_err());
    /// ```
    pub fn parse(id: &str) -> Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_id("principal id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The `system.Everyone` pseudo-principal.
    pub fn everyone() -> Self {
        Self(Self::EVERYONE.to_string())
    }

    /// Returns `true` for the `system.Everyone` pseudo-principal.
    pub fn is_everyone(&self) -> bool {
        self.0 == Self::EVERYONE
    }

    /// Returns `true` if this id names a group.
    pub fn is_group(&self) -> bool {
        self.0.starts_with(GROUP_PREFIX)
    }

    /// Returns the principal id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PrincipalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
