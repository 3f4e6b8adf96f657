//! Fabryk ACL
//!
//! Entry point for the `fabryk-acl` server and admin tool.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use fabryk_cli::cli::{AclAction, Cli, Command};
use fabryk_cli::config_handlers::handle_config_command;
use fabryk_cli::{AclServerConfig, commands};
use fabryk_core::ConfigManager;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fabryk=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Serve { host, port } => {
            let config = AclServerConfig::load(config_path)?;
            drop(stdout);
            commands::serve(config, host, port).await?;
        }
        Command::Acl { action } => {
            let config = AclServerConfig::load(config_path)?;
            match action {
                AclAction::Show { id, json } => {
                    commands::acl_show(&config, &id, json, &mut stdout).await?;
                }
                AclAction::Check {
                    id,
                    principal,
                    groups,
                    permission,
                } => {
                    commands::acl_check(&config, &id, &principal, &groups, &permission, &mut stdout)?;
                }
            }
        }
        Command::Config { action } => handle_config_command(config_path, action, &mut stdout)?,
    }
    Ok(())
}
