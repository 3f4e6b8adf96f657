//! Displayable ACL panels.
//!
//! Live clients re-fetch these after every `ACLModified` signal: the local
//! panel with per-row move controls, and the read-only inherited panel.

use std::sync::Arc;

use fabryk_core::{PrincipalId, ResourceId};
use serde::Serialize;

use crate::ace::{Ace, Verb};
use crate::acl::{Acl, AclSnapshot};
use crate::directory::{Directory, PrincipalNames};
use crate::hierarchy::ParentAcl;

/// One rendered entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AceRow {
    /// Position within its ACL.
    pub index: usize,
    /// Allow or Deny.
    pub verb: Verb,
    /// Principal id.
    pub principal: PrincipalId,
    /// Directory name for the principal.
    pub display_name: String,
    /// Sorted, comma-joined permission names.
    pub permissions: String,
    /// Whether a move-up control applies.
    pub can_move_up: bool,
    /// Whether a move-down control applies.
    pub can_move_down: bool,
}

/// The read-only inherited panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InheritedPanel {
    /// Ancestor the rows come from; `None` when nothing is inherited.
    pub source: Option<ResourceId>,
    /// Rows of the ancestor's ACL.
    pub rows: Vec<AceRow>,
}

/// Both panels for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclPanels {
    /// Resource being edited.
    pub resource: ResourceId,
    /// Editable local entries.
    pub local: Vec<AceRow>,
    /// Entries shown as inherited.
    pub inherited: InheritedPanel,
    /// Current inheritance flag.
    pub inherit: bool,
    /// Root resources get no inheritance toggle.
    pub is_root: bool,
}

/// Turns ACL state into [`AclPanels`] using directory names.
#[derive(Clone)]
pub struct PanelRenderer {
    directory: Arc<dyn Directory>,
}

impl PanelRenderer {
    /// Creates a renderer resolving names through `directory`.
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Renders both panels.
    pub async fn render(
        &self,
        resource: &ResourceId,
        snapshot: &AclSnapshot,
        parent: Option<&ParentAcl>,
        is_root: bool,
    ) -> AclPanels {
        let mut ids = snapshot.acl.principals();
        if let Some(parent) = parent {
            ids.extend(parent.acl.principals());
        }
        ids.sort();
        ids.dedup();
        let names = self.directory.display_names(&ids).await;

        AclPanels {
            resource: resource.clone(),
            local: rows(&snapshot.acl, &names, true),
            inherited: parent.map_or_else(InheritedPanel::default, |p| InheritedPanel {
                source: Some(p.resource.clone()),
                rows: rows(&p.acl, &names, false),
            }),
            inherit: snapshot.inherit,
            is_root,
        }
    }
}

impl std::fmt::Debug for PanelRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelRenderer").finish_non_exhaustive()
    }
}

fn rows(acl: &Acl, names: &PrincipalNames, editable: bool) -> Vec<AceRow> {
    let last = acl.len().saturating_sub(1);
    acl.iter()
        .enumerate()
        .map(|(index, ace)| row(index, ace, names, editable && index > 0, editable && index < last))
        .collect()
}

fn row(index: usize, ace: &Ace, names: &PrincipalNames, up: bool, down: bool) -> AceRow {
    AceRow {
        index,
        verb: ace.verb(),
        principal: ace.principal().clone(),
        display_name: names
            .name_of(ace.principal())
            .unwrap_or(ace.principal().as_str())
            .to_string(),
        permissions: ace.permissions().to_string(),
        can_move_up: up,
        can_move_down: down,
    }
}
