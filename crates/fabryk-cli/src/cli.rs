//! Command-line definitions.

use clap::{Parser, Subcommand};

/// Fabryk ACL server and administration tool
#[derive(Parser, Debug)]
#[command(name = "fabryk-acl")]
#[command(version, about = "Fabryk ACL management server", long_about = None)]
pub struct Cli {
    /// Configuration file path (overrides FABRYK_ACL_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Inspect configured ACLs
    Acl {
        #[command(subcommand)]
        action: AclAction,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `acl` subcommands.
#[derive(Subcommand, Debug)]
pub enum AclAction {
    /// Show the local and inherited entries of a resource
    Show {
        /// Resource id
        id: String,
        /// Print panels as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a permission for a principal
    Check {
        /// Resource id
        id: String,
        /// Principal id
        #[arg(long)]
        principal: String,
        /// Group memberships of the principal
        #[arg(long = "group")]
        groups: Vec<String>,
        /// Permission name
        #[arg(long)]
        permission: String,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved config file path
    Path,
    /// Print a value by dotted key
    Get {
        /// Dotted key, e.g. `server.port`
        key: String,
    },
    /// Set a value by dotted key
    Set {
        /// Dotted key
        key: String,
        /// New value (bool, integer, float or string)
        value: String,
    },
    /// Write a default config file
    Init {
        /// Target path (defaults to the platform config dir)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration as environment variables
    Export {
        /// Format as `--env KEY=VALUE` for `docker run`
        #[arg(long)]
        docker_env: bool,
    },
}
