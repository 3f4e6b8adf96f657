//! Turns an [`AclServerConfig`] into live components.

use std::collections::HashMap;
use std::sync::Arc;

use fabryk_acl::{
    Ace, Acl, AclAuthorizer, AclService, AclSnapshot, AllowAll, AuditLog, Authorizer,
    ChangeNotifier, EditSession, HierarchyResolver, MemoryTree, PermissionSet, ResourceTree,
    StaticCatalog, StaticDirectory,
};
use fabryk_api::AppState;
use fabryk_auth::{AuthConfig, StaticTokenValidator};
use fabryk_core::{PrincipalId, ResourceId};

use crate::config::{AclServerConfig, ResourceConfig};
use crate::{Error, Result};

/// Builds the resource tree and seeds every configured ACL.
///
/// Resources may be listed in any order; each is placed once its parent
/// exists. Exactly one root is allowed.
pub fn build_service(config: &AclServerConfig) -> Result<Arc<AclService>> {
    let tree = Arc::new(MemoryTree::new());
    let mut pending: Vec<&ResourceConfig> = config.resources.iter().collect();
    let mut roots = 0;

    while !pending.is_empty() {
        let before = pending.len();
        let mut waiting = Vec::new();
        for resource in pending {
            let id = ResourceId::parse(&resource.id)?;
            match &resource.parent {
                None => {
                    roots += 1;
                    if roots > 1 {
                        return Err(Error::config(format!(
                            "resource '{id}' has no parent but a root is already defined"
                        )));
                    }
                    tree.insert_root(id)?;
                }
                Some(parent) => {
                    let parent = ResourceId::parse(parent)?;
                    if tree.contains(&parent) {
                        tree.insert(id, parent)?;
                    } else {
                        waiting.push(resource);
                    }
                }
            }
        }
        if waiting.len() == before {
            let orphans: Vec<&str> = waiting.iter().map(|r| r.id.as_str()).collect();
            return Err(Error::config(format!(
                "resources with unknown parents: {}",
                orphans.join(", ")
            )));
        }
        pending = waiting;
    }

    let notifier = ChangeNotifier::new(tree.clone(), config.notifier.subscriber_buffer);
    let audit = Arc::new(AuditLog::new(config.audit.max_layers, config.audit.layer_size));
    let service = Arc::new(AclService::new(tree, notifier, audit));
    for resource in &config.resources {
        service.seed(&ResourceId::parse(&resource.id)?, snapshot(resource)?)?;
    }
    log::debug!("Seeded {} resource ACL(s)", config.resources.len());
    Ok(service)
}

fn snapshot(resource: &ResourceConfig) -> Result<AclSnapshot> {
    let acl = resource
        .entries
        .iter()
        .map(|entry| {
            let principal = PrincipalId::parse(&entry.principal)?;
            let permissions = PermissionSet::new(entry.permissions.iter().map(String::as_str))?;
            Ok(Ace::new(entry.verb, principal, permissions)?)
        })
        .collect::<Result<Vec<Ace>>>()?;
    Ok(AclSnapshot {
        acl: Acl::from(acl),
        inherit: resource.inherit.unwrap_or(true),
    })
}

/// Directory populated from `[directory]`.
pub fn directory(config: &AclServerConfig) -> StaticDirectory {
    let users = config
        .directory
        .users
        .iter()
        .fold(StaticDirectory::new(), |dir, (id, name)| {
            dir.with_user(id.as_str(), name.as_str())
        });
    config
        .directory
        .groups
        .iter()
        .fold(users, |dir, (id, name)| dir.with_group(id.as_str(), name.as_str()))
}

/// Authorizer honoring `superusers` and the ACLs themselves.
pub fn authorizer(config: &AclServerConfig, resolver: HierarchyResolver) -> Result<AclAuthorizer> {
    let superusers = config
        .superusers
        .iter()
        .map(|p| PrincipalId::parse(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(AclAuthorizer::new(resolver).with_superusers(superusers))
}

/// Full HTTP handler state.
pub fn app_state(config: &AclServerConfig, service: Arc<AclService>) -> Result<AppState> {
    let resolver = HierarchyResolver::new(service);
    let authorizer = authorizer(config, resolver.clone())?;
    Ok(edit_state(config, resolver, Arc::new(authorizer)))
}

/// Handler state that lets every caller manage every ACL, for local
/// operator commands.
pub fn operator_state(config: &AclServerConfig, service: Arc<AclService>) -> AppState {
    edit_state(config, HierarchyResolver::new(service), Arc::new(AllowAll))
}

fn edit_state(
    config: &AclServerConfig,
    resolver: HierarchyResolver,
    authorizer: Arc<dyn Authorizer>,
) -> AppState {
    let directory = Arc::new(directory(config));
    let session = EditSession::new(resolver, authorizer, directory.clone());
    let catalog = Arc::new(StaticCatalog::new(config.permissions.iter().cloned()));
    AppState::new(session, directory, catalog).with_keep_alive(config.server.keep_alive())
}

/// Auth layer settings from `[auth]`.
pub fn auth_config(config: &AclServerConfig) -> AuthConfig {
    let mut auth = AuthConfig {
        enabled: config.auth.enabled,
        ..Default::default()
    };
    if !config.auth.realm.is_empty() {
        auth.realm = config.auth.realm.clone();
    }
    auth
}

/// Token table from `[auth.tokens]` and `[auth.memberships]`.
pub fn token_validator(config: &AclServerConfig) -> Result<StaticTokenValidator> {
    let tokens = config
        .auth
        .tokens
        .iter()
        .map(|(token, principal)| Ok((token.clone(), PrincipalId::parse(principal)?)))
        .collect::<Result<HashMap<_, _>>>()?;
    let memberships = config
        .auth
        .memberships
        .iter()
        .map(|(principal, groups)| {
            let groups = groups
                .iter()
                .map(|g| PrincipalId::parse(g))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok((PrincipalId::parse(principal)?, groups))
        })
        .collect::<Result<HashMap<_, _>>>()?;
    if config.auth.enabled && tokens.is_empty() {
        log::warn!("Authentication is enabled but no tokens are configured");
    }
    Ok(StaticTokenValidator::new(tokens).with_memberships(memberships))
}
