//! # fabryk-api
//!
//! HTTP adapter for the Fabryk ACL engine.
//!
//! This crate provides the HTTP surface:
//! - Read and mutate endpoints backed by [`fabryk_acl::EditSession`]
//! - Bulk-effect (`pathcount`) queries
//! - Server-sent events for `ACLModified` notifications
//! - Audit history, permission catalog and principal search
//! - Error taxonomy mapped onto HTTP status codes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod caller;
pub mod error;
pub mod routes;
pub mod server;
pub mod sse;
pub mod state;

pub use caller::CurrentCaller;
pub use error::{Error, Result};
pub use server::{app, serve};
pub use state::AppState;
