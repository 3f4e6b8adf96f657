//! Generic authentication primitives for Fabryk.
//!
//! Provides:
//! - [`AuthenticatedUser`]: identity extracted from a validated token
//! - [`TokenValidator`]: trait for async token validation (implement per provider)
//! - [`StaticTokenValidator`]: fixed token table, for config-driven deployments
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware parameterised over `TokenValidator`
//! - [`AuthConfig`]: configuration for the auth layer
//! - [`AuthError`]: auth-specific error types

mod error;
mod middleware;
mod user;
mod validator;

pub use error::AuthError;
pub use middleware::{AuthLayer, AuthService};
pub use user::{principal_from_parts, user_from_parts, AuthenticatedUser};
pub use validator::StaticTokenValidator;

/// Configuration for the auth middleware.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Whether authentication is enabled. When false, all requests pass
    /// through as `system.Everyone`.
    pub enabled: bool,
    /// Realm advertised in `WWW-Authenticate` challenges.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            realm: "fabryk-acl".to_string(),
        }
    }
}

/// Trait for validating tokens and extracting user identity.
///
/// Implement this for each identity provider. The middleware calls
/// `validate()` with the bearer token and returns the authenticated user
/// on success.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validate a token and return the authenticated user.
    fn validate(
        &self,
        token: &str,
        config: &AuthConfig,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<AuthenticatedUser, AuthError>> + Send + '_>,
    >;
}
