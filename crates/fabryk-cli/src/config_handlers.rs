//! `config` subcommands.
//!
//! Each handler is generic over [`ConfigManager`] and writes to the given
//! output, so the binary passes stdout and tests pass a buffer.

use std::io::Write;
use std::path::PathBuf;

use fabryk_core::traits::ConfigManager;
use fabryk_core::{Error, Result};

use crate::cli::ConfigAction;
use crate::config::AclServerConfig;

/// Dispatches a `config` subcommand for [`AclServerConfig`].
pub fn handle_config_command(
    config_path: Option<&str>,
    action: ConfigAction,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        ConfigAction::Path => config_path_cmd::<AclServerConfig>(config_path, out),
        ConfigAction::Get { key } => config_get::<AclServerConfig>(config_path, &key, out),
        ConfigAction::Set { key, value } => {
            config_set::<AclServerConfig>(config_path, &key, &value, out)
        }
        ConfigAction::Init { file, force } => {
            config_init::<AclServerConfig>(file.as_deref().or(config_path), force, out)
        }
        ConfigAction::Export { docker_env } => {
            let config = AclServerConfig::load(config_path)?;
            config_export(&config, docker_env, out)
        }
    }
}

fn emit(out: &mut impl Write, line: impl std::fmt::Display) -> Result<()> {
    writeln!(out, "{line}")?;
    Ok(())
}

fn config_file<C: ConfigManager>(config_path: Option<&str>) -> Result<PathBuf> {
    C::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory for this platform"))
}

/// Prints the resolved config path; notes when the file is missing.
pub fn config_path_cmd<C: ConfigManager>(
    config_path: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let path = config_file::<C>(config_path)?;
    emit(out, path.display())?;
    if !path.exists() {
        log::info!(
            "{} does not exist yet; `{} config init` creates it",
            path.display(),
            C::project_name()
        );
    }
    Ok(())
}

/// Prints the value at a dotted key of the effective configuration.
pub fn config_get<C: ConfigManager>(
    config_path: Option<&str>,
    key: &str,
    out: &mut impl Write,
) -> Result<()> {
    let config = C::load(config_path)?;
    let value = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
    let found = lookup(&value, key)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))?;
    emit(out, display_value(found))
}

/// Sets a dotted key in the config file.
///
/// The edited document must still deserialize as `C`; otherwise the file
/// is left untouched.
pub fn config_set<C: ConfigManager>(
    config_path: Option<&str>,
    key: &str,
    raw: &str,
    out: &mut impl Write,
) -> Result<()> {
    let path = config_file::<C>(config_path)?;
    if !path.exists() {
        return Err(Error::config(format!(
            "Config file does not exist at {}. Run `{} config init` first.",
            path.display(),
            C::project_name()
        )));
    }
    let content = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
    let mut doc: toml::Value = toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;

    assign(&mut doc, key, infer_value(raw))?;
    let checked: C = doc
        .clone()
        .try_into()
        .map_err(|e| Error::config(format!("'{key} = {raw}' is not valid here: {e}")))?;

    std::fs::write(&path, checked.to_toml_string()?).map_err(|e| Error::io_with_path(e, &path))?;
    emit(out, format_args!("Set {key} = {raw} in {}", path.display()))
}

/// Writes the default configuration to `file` (or the default path).
pub fn config_init<C: ConfigManager>(
    file: Option<&str>,
    force: bool,
    out: &mut impl Write,
) -> Result<()> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => C::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };
    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }
    std::fs::write(&path, C::default().to_toml_string()?)
        .map_err(|e| Error::io_with_path(e, &path))?;
    emit(out, format_args!("Config file created at {}", path.display()))
}

/// Prints every scalar setting as `PREFIX_SECTION_KEY=value`.
pub fn config_export<C: ConfigManager>(
    config: &C,
    docker_env: bool,
    out: &mut impl Write,
) -> Result<()> {
    for (key, value) in config.to_env_vars()? {
        if docker_env {
            emit(out, format_args!("--env {key}={value}"))?;
        } else {
            emit(out, format_args!("{key}={value}"))?;
        }
    }
    Ok(())
}

/// Value at a dotted path.
pub fn lookup<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |node, part| node.as_table()?.get(part))
}

/// Stores `value` at a dotted path, creating tables along the way.
pub fn assign(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };
    if leaf.is_empty() {
        return Err(Error::config(format!("Invalid key '{key}'")));
    }
    let mut node = root;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        let table = node
            .as_table_mut()
            .ok_or_else(|| Error::config(format!("'{part}' in '{key}' is not a table")))?;
        node = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    let table = node
        .as_table_mut()
        .ok_or_else(|| Error::config(format!("Cannot set '{key}' on a non-table value")))?;
    table.insert(leaf.to_string(), value);
    Ok(())
}

/// Interprets a command-line value as bool, integer, float or string.
pub fn infer_value(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(raw.to_string())
    }
}

fn display_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        scalar => scalar.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
