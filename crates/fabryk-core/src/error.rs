//! Error types for fabryk-core

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for fabryk-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fabryk-core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error, optionally tied to the path being accessed.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    Io {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path involved in the failed operation
        path: Option<PathBuf>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Identifier failed validation
    #[error("Invalid identifier: {message}")]
    InvalidId {
        /// Why the identifier was rejected
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path that caused it.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            source,
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Creates a new identifier validation error.
    pub fn invalid_id<S: Into<String>>(message: S) -> Self {
        Error::InvalidId {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source, path: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("missing [server] section");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing [server] section"
        );
    }

    #[test]
    fn test_io_with_path_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(io, "/tmp/acl.toml");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/acl.toml"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_io_without_path_display() {
        let io = std::io::Error::other("boom");
        let err: Error = io.into();
        assert_eq!(err.to_string(), "I/O error: boom");
    }

    #[test]
    fn test_invalid_id_display() {
        let err = Error::invalid_id("resource id must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid identifier: resource id must not be empty"
        );
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
