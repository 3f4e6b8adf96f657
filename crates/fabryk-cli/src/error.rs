//! Error types for fabryk-cli

use thiserror::Error;

/// Result type alias for fabryk-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fabryk-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from fabryk-core (I/O, config parsing, ids)
    #[error(transparent)]
    Core(#[from] fabryk_core::Error),

    /// Error from the ACL engine
    #[error(transparent)]
    Acl(#[from] fabryk_acl::Error),

    /// Error from the HTTP server
    #[error(transparent)]
    Api(#[from] fabryk_api::Error),
}

impl Error {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Core(fabryk_core::Error::config(message))
    }
}
