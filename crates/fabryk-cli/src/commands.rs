//! `serve` and `acl` command implementations.

use std::io::Write;
use std::sync::Arc;

use fabryk_acl::{AclPanels, AceRow, Caller, Decision, HierarchyResolver};
use fabryk_core::{PrincipalId, ResourceId};

use crate::bootstrap;
use crate::config::AclServerConfig;
use crate::Result;

/// Runs the HTTP server until ctrl-c or SIGTERM.
pub async fn serve(mut config: AclServerConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = config.server.socket_addr()?;
    let service = bootstrap::build_service(&config)?;
    let resources = service.resources().len();
    let state = bootstrap::app_state(&config, service)?;
    let validator = Arc::new(bootstrap::token_validator(&config)?);
    let app = fabryk_api::app(state, validator, bootstrap::auth_config(&config));

    tracing::info!(
        %addr,
        resources,
        auth = config.auth.enabled,
        keep_alive_secs = config.server.keep_alive_secs,
        "Starting ACL server"
    );
    fabryk_api::serve(app, addr, shutdown_signal()).await?;
    tracing::info!("ACL server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Prints both panels of `id` as seeded from the configuration.
pub async fn acl_show(
    config: &AclServerConfig,
    id: &str,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let resource = ResourceId::parse(id)?;
    let service = bootstrap::build_service(config)?;
    let state = bootstrap::operator_state(config, service);
    let panels = state.session.view(&Caller::anonymous(), &resource).await?;
    if json {
        let text = serde_json::to_string_pretty(&panels).map_err(fabryk_core::Error::from)?;
        writeln!(out, "{text}").map_err(fabryk_core::Error::from)?;
    } else {
        write_panels(&panels, out).map_err(fabryk_core::Error::from)?;
    }
    Ok(())
}

fn write_panels(panels: &AclPanels, out: &mut impl Write) -> std::io::Result<()> {
    let inherit = if panels.is_root {
        "n/a (root)"
    } else if panels.inherit {
        "enabled"
    } else {
        "disabled"
    };
    writeln!(out, "Resource:    {}", panels.resource)?;
    writeln!(out, "Inheritance: {inherit}")?;
    writeln!(out)?;
    writeln!(out, "Local ACL:")?;
    write_rows(&panels.local, out)?;
    match &panels.inherited.source {
        Some(source) => {
            writeln!(out)?;
            writeln!(out, "Inherited from {source}:")?;
            write_rows(&panels.inherited.rows, out)
        }
        None => Ok(()),
    }
}

fn write_rows(rows: &[AceRow], out: &mut impl Write) -> std::io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "  (none)");
    }
    for row in rows {
        let who = if row.display_name == row.principal.as_str() {
            row.display_name.clone()
        } else {
            format!("{} ({})", row.display_name, row.principal)
        };
        writeln!(
            out,
            "  {:>3}  {:<5}  {who}: {}",
            row.index,
            row.verb.as_str(),
            row.permissions
        )?;
    }
    Ok(())
}

/// Evaluates `permission` for a principal and its groups on `id`.
pub fn acl_check(
    config: &AclServerConfig,
    id: &str,
    principal: &str,
    groups: &[String],
    permission: &str,
    out: &mut impl Write,
) -> Result<Decision> {
    let resource = ResourceId::parse(id)?;
    let caller = Caller::new(
        PrincipalId::parse(principal)?,
        groups
            .iter()
            .map(|g| PrincipalId::parse(g))
            .collect::<std::result::Result<Vec<_>, _>>()?,
    );
    let resolver = HierarchyResolver::new(bootstrap::build_service(config)?);
    let decision = resolver.permits(&resource, &caller.principals(), permission)?;
    let line = match &decision {
        Decision::Allowed { source } => format!("allowed (entry on {source})"),
        Decision::Denied { source } => format!("denied (entry on {source})"),
        Decision::NoMatch => "denied (no matching entry)".to_string(),
    };
    writeln!(out, "{permission} for {principal} on {resource}: {line}")
        .map_err(fabryk_core::Error::from)?;
    Ok(decision)
}
