//! Server configuration.
//!
//! Loaded from TOML through [`ConfigManager`]. Every section has serde
//! defaults, so an empty file (or none at all) yields a runnable server
//! with a single `root` resource.
//!
//! ```toml
//! permissions = ["view", "edit", "sdi.change-acls"]
//! superusers = ["admin"]
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8700
//!
//! [auth]
//! enabled = true
//! [auth.tokens]
//! "s3cret" = "admin"
//!
//! [[resources]]
//! id = "root"
//!
//! [[resources]]
//! id = "docs"
//! parent = "root"
//! inherit = true
//! entries = [{ verb = "Allow", principal = "group:editors", permissions = ["edit"] }]
//! ```

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use fabryk_acl::Verb;
use fabryk_core::traits::ConfigManager;
use fabryk_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration of the `fabryk-acl` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclServerConfig {
    /// Permission names offered when adding entries.
    pub permissions: Vec<String>,
    /// Principals that may always manage ACLs.
    pub superusers: Vec<String>,
    /// HTTP listener.
    pub server: ServerConfig,
    /// Change notifier tuning.
    pub notifier: NotifierConfig,
    /// Audit log retention.
    pub audit: AuditConfig,
    /// Token authentication.
    pub auth: AuthSection,
    /// Principal display names.
    pub directory: DirectoryConfig,
    /// Resource tree and seed ACLs.
    pub resources: Vec<ResourceConfig>,
}

impl Default for AclServerConfig {
    fn default() -> Self {
        Self {
            permissions: ["view", "edit", "delete", fabryk_acl::CHANGE_ACLS]
                .into_iter()
                .map(String::from)
                .collect(),
            superusers: Vec::new(),
            server: ServerConfig::default(),
            notifier: NotifierConfig::default(),
            audit: AuditConfig::default(),
            auth: AuthSection::default(),
            directory: DirectoryConfig::default(),
            resources: vec![ResourceConfig::root("root")],
        }
    }
}

impl ConfigManager for AclServerConfig {
    fn project_name() -> &'static str {
        "fabryk-acl"
    }
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// SSE heartbeat interval in seconds.
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8700,
            keep_alive_secs: 15,
        }
    }
}

impl ServerConfig {
    /// Parsed listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| Error::config(format!("invalid server.host '{}': {e}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Heartbeat interval; zero is raised to one second.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }
}

/// `[notifier]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Per-subscriber queue depth. Events beyond it are dropped.
    pub subscriber_buffer: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
        }
    }
}

/// `[audit]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Layers retained before the oldest is pruned.
    pub max_layers: usize,
    /// Entries per layer.
    pub layer_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_layers: 10,
            layer_size: 100,
        }
    }
}

/// `[auth]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Require a token on API routes.
    pub enabled: bool,
    /// Realm for `WWW-Authenticate` challenges; empty uses the default.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub realm: String,
    /// Token → principal.
    pub tokens: BTreeMap<String, String>,
    /// Principal → groups.
    pub memberships: BTreeMap<String, Vec<String>>,
}

/// `[directory]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// User id → display name.
    pub users: BTreeMap<String, String>,
    /// Group id → display name.
    pub groups: BTreeMap<String, String>,
}

/// One `[[resources]]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource id.
    pub id: String,
    /// Parent id; omitted for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Inheritance flag; defaults to enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit: Option<bool>,
    /// Seed entries in precedence order.
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

impl ResourceConfig {
    /// A root resource with no entries.
    pub fn root(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            inherit: None,
            entries: Vec::new(),
        }
    }
}

/// One seed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// `Allow` or `Deny`.
    pub verb: Verb,
    /// Principal id.
    pub principal: String,
    /// Permission names.
    pub permissions: Vec<String>,
}
