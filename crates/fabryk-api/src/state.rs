//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;

use fabryk_acl::{AclService, Directory, EditSession, PermissionCatalog};

/// Default SSE heartbeat interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// State shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Edit session handler (read path, mutations, pathcount).
    pub session: EditSession,
    /// Principal directory for search.
    pub directory: Arc<dyn Directory>,
    /// Offerable permission names.
    pub catalog: Arc<dyn PermissionCatalog>,
    /// SSE heartbeat interval.
    pub keep_alive: Duration,
}

impl AppState {
    /// Creates state with the default heartbeat.
    pub fn new(
        session: EditSession,
        directory: Arc<dyn Directory>,
        catalog: Arc<dyn PermissionCatalog>,
    ) -> Self {
        Self {
            session,
            directory,
            catalog,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    /// Sets the SSE heartbeat interval.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The ACL store behind the session.
    pub fn service(&self) -> &Arc<AclService> {
        self.session.resolver().service()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session", &self.session)
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}
