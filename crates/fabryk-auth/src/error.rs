//! Auth-specific error types.

/// Errors that can occur during authentication.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No bearer header or `token` query parameter present.
    #[error("missing authentication token")]
    MissingToken,

    /// Token is syntactically unusable.
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// Token is well-formed but not recognised.
    #[error("unknown token")]
    UnknownToken,

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// The identity backend could not be consulted.
    #[error("identity backend unavailable: {0}")]
    Backend(String),
}

impl AuthError {
    /// Whether this error should result in a 401 (vs. a 500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::InvalidFormat(_)
                | AuthError::UnknownToken
                | AuthError::Expired
        )
    }
}
