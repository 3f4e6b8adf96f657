//! Authenticated caller identity and extraction helpers.

use fabryk_core::PrincipalId;

/// A caller identity, extracted from a validated token.
///
/// Stored in HTTP request extensions by the auth middleware; handlers turn
/// it into an ACL caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The caller's principal id.
    pub principal: PrincipalId,
    /// Groups the caller belongs to.
    pub groups: Vec<PrincipalId>,
}

impl AuthenticatedUser {
    /// Creates a user without group memberships.
    pub fn new(principal: impl Into<PrincipalId>) -> Self {
        Self {
            principal: principal.into(),
            groups: Vec::new(),
        }
    }

    /// Adds group memberships.
    pub fn with_groups<I, P>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PrincipalId>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }
}

/// Extract the `AuthenticatedUser` from HTTP request `Parts`, if present.
pub fn user_from_parts(parts: &http::request::Parts) -> Option<&AuthenticatedUser> {
    parts.extensions.get::<AuthenticatedUser>()
}

/// Extract the caller's principal from HTTP request `Parts`.
///
/// Returns `system.Everyone` if no authenticated user is present (auth
/// disabled).
pub fn principal_from_parts(parts: &http::request::Parts) -> PrincipalId {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .map(|u| u.principal.clone())
        .unwrap_or_else(PrincipalId::everyone)
}
