//! Configuration management trait.
//!
//! [`ConfigManager`] gives every Fabryk binary the same config lifecycle:
//! resolve a path (explicit flag, then `{PROJECT}_CONFIG`, then the
//! platform config dir), load TOML with serde defaults, and export the
//! resolved values as environment variables.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Shared behaviour for TOML-backed configuration types.
pub trait ConfigManager: Serialize + DeserializeOwned + Default {
    /// Project name, used for the config directory and env var prefix.
    fn project_name() -> &'static str;

    /// Environment variable prefix derived from the project name.
    ///
    /// `"fabryk-acl"` becomes `"FABRYK_ACL"`.
    fn env_prefix() -> String {
        Self::project_name().to_uppercase().replace(['-', ' '], "_")
    }

    /// Default location: `<config dir>/<project>/config.toml`.
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::project_name()).join("config.toml"))
    }

    /// Resolve the config path.
    ///
    /// Checks in order:
    /// 1. The explicit path, if given
    /// 2. `{PREFIX}_CONFIG` environment variable
    /// 3. [`default_config_path`](Self::default_config_path)
    fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(format!("{}_CONFIG", Self::env_prefix())) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        Self::default_config_path()
    }

    /// Load configuration, falling back to defaults when no file exists.
    fn load(explicit: Option<&str>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit) else {
            log::debug!("No config directory on this platform; using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            log::debug!("Config file {} not found; using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty TOML.
    fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten scalar values into `PREFIX_SECTION_KEY=value` pairs.
    ///
    /// Arrays of scalars are comma-joined; arrays of tables are skipped.
    fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value = toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_env(&Self::env_prefix(), &value, &mut vars);
        Ok(vars)
    }
}

fn flatten_env(prefix: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, child) in table {
                let name = format!("{prefix}_{}", key.to_uppercase().replace(['-', '.'], "_"));
                flatten_env(&name, child, out);
            }
        }
        toml::Value::Array(items) => {
            if items.iter().any(|v| v.is_table() || v.is_array()) {
                return;
            }
            let joined: Vec<String> = items.iter().map(scalar_string).collect();
            out.push((prefix.to_string(), joined.join(",")));
        }
        scalar => out.push((prefix.to_string(), scalar_string(scalar))),
    }
}

fn scalar_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
