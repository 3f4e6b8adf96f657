//! Request caller extraction.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fabryk_acl::Caller;
use fabryk_auth::user_from_parts;

/// The caller of the current request.
///
/// Built from the [`fabryk_auth::AuthenticatedUser`] the auth layer put in
/// the request extensions; anonymous (`system.Everyone`) when auth is
/// disabled.
#[derive(Debug, Clone)]
pub struct CurrentCaller(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for CurrentCaller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = match user_from_parts(parts) {
            Some(user) => Caller::new(user.principal.clone(), user.groups.clone()),
            None => Caller::anonymous(),
        };
        Ok(Self(caller))
    }
}
