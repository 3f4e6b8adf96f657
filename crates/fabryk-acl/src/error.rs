//! Error types for fabryk-acl

use fabryk_core::{PrincipalId, ResourceId};
use thiserror::Error;

/// Result type alias for fabryk-acl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] variants.
///
/// Lets callers (HTTP adapters, UI layers) branch on the taxonomy without
/// matching on variant payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed mutation input.
    Validation,
    /// ACE index out of range.
    Index,
    /// Operation not applicable to the current state.
    InvalidOperation,
    /// Caller may not manage this ACL.
    Forbidden,
    /// Structurally invalid request.
    BadRequest,
    /// Unknown resource.
    NotFound,
    /// Resource already registered.
    Conflict,
    /// Infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name, used in wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Index => "index",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors that can occur in fabryk-acl
///
/// Every variant is reported before any shared state is touched, so an
/// `Err` always means the ACL is unchanged.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed input to a mutation (empty permission set, empty principal).
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// ACE index outside the current ACL.
    #[error("ACE index {index} out of range (ACL has {len} entries)")]
    Index {
        /// Requested index
        index: usize,
        /// ACL length at the time of the request
        len: usize,
    },

    /// Operation not applicable to the resource's current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Caller lacks permission to manage this resource's ACL.
    #[error("Forbidden: {principal} may not manage the ACL of {resource}")]
    Forbidden {
        /// Caller that was refused
        principal: PrincipalId,
        /// Resource the caller targeted
        resource: ResourceId,
    },

    /// Structurally invalid request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No ACL is registered for the resource.
    #[error("Resource not found: {id}")]
    ResourceNotFound {
        /// Resource that was not found
        id: ResourceId,
    },

    /// An ACL is already registered for the resource.
    #[error("Resource already exists: {id}")]
    ResourceExists {
        /// Resource that already exists
        id: ResourceId,
    },

    /// Error from fabryk-core
    #[error("Core error: {0}")]
    Core(#[from] fabryk_core::Error),
}

impl Error {
    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Error::BadRequest(message.into())
    }

    /// Creates a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(message: S) -> Self {
        Error::InvalidOperation(message.into())
    }

    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Index { .. } => ErrorKind::Index,
            Error::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::ResourceNotFound { .. } => ErrorKind::NotFound,
            Error::ResourceExists { .. } => ErrorKind::Conflict,
            Error::Core(fabryk_core::Error::InvalidId { .. }) => ErrorKind::Validation,
            Error::Core(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error was caused by the caller (vs. the server).
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_with_field() {
        let err = Error::validation_field("permissions", "must not be empty");
        let Error::Validation { field, message } = &err else {
            unreachable!("Expected Validation error variant");
        };
        assert_eq!(field.as_deref(), Some("permissions"));
        assert_eq!(message, "must not be empty");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_index_error_display() {
        let err = Error::Index { index: 3, len: 1 };
        assert_eq!(
            err.to_string(),
            "ACE index 3 out of range (ACL has 1 entries)"
        );
        assert_eq!(err.kind(), ErrorKind::Index);
    }

    #[test]
    fn test_forbidden_display() {
        let err = Error::Forbidden {
            principal: PrincipalId::new("mallory"),
            resource: ResourceId::new("vault"),
        };
        assert_eq!(
            err.to_string(),
            "Forbidden: mallory may not manage the ACL of vault"
        );
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            Error::validation("x").kind(),
            Error::Index { index: 0, len: 0 }.kind(),
            Error::invalid_operation("x").kind(),
            Error::bad_request("x").kind(),
            Error::ResourceNotFound {
                id: ResourceId::new("r"),
            }
            .kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_core_invalid_id_is_validation() {
        let err: Error = fabryk_core::Error::invalid_id("empty").into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_core_io_is_internal() {
        let err: Error = fabryk_core::Error::from(std::io::Error::other("disk")).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_error_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
