//! Fabryk Core — shared identifiers, errors, and configuration traits.
//!
//! This crate provides the foundational types used across all Fabryk ACL
//! crates. It has no internal Fabryk dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`ids`]: Resource and principal identifiers
//! - [`traits`]: Configuration management trait

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod error;
pub mod ids;
pub mod traits;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use ids::{PrincipalId, ResourceId};
pub use traits::ConfigManager;

mod proptests;
