//! # fabryk-cli
//!
//! The `fabryk-acl` binary: runs the ACL HTTP server and offers operator
//! commands against the configured resource tree.
//!
//! - `serve`: HTTP API with live updates
//! - `acl show` / `acl check`: inspect seeded ACLs offline
//! - `config path|get|set|init|export`: manage the TOML config

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod config;
pub mod config_handlers;
pub mod error;

pub use config::AclServerConfig;
pub use error::{Error, Result};
