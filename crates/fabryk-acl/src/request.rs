//! ACL mutation requests.
//!
//! [`AclRequest`] is both the wire format accepted by the edit session and
//! the single definition of what each mutation does to an
//! [`AclSnapshot`]. The store applies requests under its write lock; the
//! pathcount query applies them to a scratch copy.
//!
//! ```json
//! {"op": "add", "verb": "Allow", "principal": "alice", "permissions": ["view"]}
//! {"op": "remove", "index": 0}
//! {"op": "move_up", "index": 1}
//! {"op": "move_down", "index": 0}
//! {"op": "set_inherit", "enabled": false}
//! ```

use fabryk_core::PrincipalId;
use serde::{Deserialize, Serialize};

use crate::ace::{Ace, PermissionSet, Verb};
use crate::acl::AclSnapshot;
use crate::{Error, Result};

/// One ACL mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum AclRequest {
    /// Append a new entry.
    Add {
        /// Allow or Deny.
        verb: Verb,
        /// Principal the entry applies to.
        principal: PrincipalId,
        /// Permission names; must be non-empty.
        permissions: Vec<String>,
    },
    /// Delete the entry at `index`.
    Remove {
        /// Entry position.
        index: usize,
    },
    /// Swap the entry at `index` with its predecessor.
    MoveUp {
        /// Entry position.
        index: usize,
    },
    /// Swap the entry at `index` with its successor.
    MoveDown {
        /// Entry position.
        index: usize,
    },
    /// Enable or disable inheritance from ancestors.
    SetInherit {
        /// New flag value.
        enabled: bool,
    },
}

impl AclRequest {
    /// Parses a request from JSON; shape errors become `BadRequest`.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::bad_request(e.to_string()))
    }

    /// Parses a request from raw bytes.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| Error::bad_request(e.to_string()))
    }

    /// Operation name as it appears on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            AclRequest::Add { .. } => "add",
            AclRequest::Remove { .. } => "remove",
            AclRequest::MoveUp { .. } => "move_up",
            AclRequest::MoveDown { .. } => "move_down",
            AclRequest::SetInherit { .. } => "set_inherit",
        }
    }

    /// Applies the request to `state`.
    ///
    /// Returns `Ok(true)` when the state changed and `Ok(false)` for
    /// boundary moves that leave it untouched. Every check runs before
    /// the first write, so `Err` leaves `state` as it was.
    pub fn apply_to(&self, state: &mut AclSnapshot, is_root: bool) -> Result<bool> {
        match self {
            AclRequest::Add {
                verb,
                principal,
                permissions,
            } => {
                let permissions = PermissionSet::new(permissions)?;
                let ace = Ace::new(*verb, principal.clone(), permissions)?;
                state.acl.push(ace);
                Ok(true)
            }
            AclRequest::Remove { index } => state.acl.remove(*index).map(|_| true),
            AclRequest::MoveUp { index } => state.acl.move_up(*index),
            AclRequest::MoveDown { index } => state.acl.move_down(*index),
            AclRequest::SetInherit { enabled } => {
                if is_root {
                    return Err(Error::invalid_operation(
                        "inheritance does not apply to the root resource",
                    ));
                }
                state.inherit = *enabled;
                Ok(true)
            }
        }
    }

    /// Audit payload describing this request.
    pub fn audit_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
