//! Token validation against a fixed table.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use fabryk_core::PrincipalId;

use crate::{AuthConfig, AuthError, AuthenticatedUser, TokenValidator};

/// Validates opaque tokens against a token → principal table.
///
/// Group memberships are attached from a separate principal → groups table.
#[derive(Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, PrincipalId>,
    memberships: HashMap<PrincipalId, Vec<PrincipalId>>,
}

impl StaticTokenValidator {
    /// Creates a validator from a token table.
    pub fn new(tokens: HashMap<String, PrincipalId>) -> Self {
        Self {
            tokens,
            memberships: HashMap::new(),
        }
    }

    /// Sets group memberships.
    pub fn with_memberships(mut self, memberships: HashMap<PrincipalId, Vec<PrincipalId>>) -> Self {
        self.memberships = memberships;
        self
    }

    /// Number of configured tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no tokens are configured.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn lookup(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.trim().is_empty() || token.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidFormat("token contains whitespace".into()));
        }
        let principal = self.tokens.get(token).ok_or(AuthError::UnknownToken)?;
        let groups = self.memberships.get(principal).cloned().unwrap_or_default();
        Ok(AuthenticatedUser {
            principal: principal.clone(),
            groups,
        })
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(
        &self,
        token: &str,
        _config: &AuthConfig,
    ) -> Pin<Box<dyn Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>> {
        let result = self.lookup(token);
        Box::pin(async move { result })
    }
}

impl std::fmt::Debug for StaticTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the tokens themselves.
        f.debug_struct("StaticTokenValidator")
            .field("tokens", &self.tokens.len())
            .field("memberships", &self.memberships.len())
            .finish()
    }
}
