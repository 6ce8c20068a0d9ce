//! Session creation and lookup.

use std::sync::Arc;

use tracing::{info, warn};

use ocfl_store::StoreEngine;
use ocfl_types::{OcflObjectId, SessionId};

use crate::config::SessionConfig;
use crate::coordinator::CommitCoordinator;
use crate::error::SessionResult;
use crate::registry::{InMemorySessionRegistry, SessionRegistry};
use crate::session::{OcflObjectSession, SessionContext};

/// Creates sessions and finds live ones by identifier.
pub trait OcflObjectSessionFactory: Send + Sync {
    /// Open a session on `object_id`. Any number of sessions may be open on
    /// one object at once; only their commits are serialized.
    fn new_session(&self, object_id: &OcflObjectId) -> SessionResult<Arc<OcflObjectSession>>;

    /// The session registered under `session_id`. Committed and aborted
    /// sessions are never returned.
    fn existing_session(&self, session_id: &SessionId) -> Option<Arc<OcflObjectSession>>;
}

/// Factory over one store engine, with one commit lock manager shared by all
/// of its sessions.
pub struct DefaultSessionFactory {
    ctx: Arc<SessionContext>,
}

impl DefaultSessionFactory {
    /// A factory with an in-memory session registry.
    pub fn new(engine: Arc<dyn StoreEngine>, config: SessionConfig) -> Self {
        Self::with_registry(engine, Arc::new(InMemorySessionRegistry::new()), config)
    }

    pub fn with_registry(
        engine: Arc<dyn StoreEngine>,
        registry: Arc<dyn SessionRegistry>,
        config: SessionConfig,
    ) -> Self {
        let coordinator = CommitCoordinator::new(engine, config.lock_timeout());
        Self {
            ctx: Arc::new(SessionContext {
                coordinator,
                registry,
                config,
            }),
        }
    }

    pub fn engine(&self) -> &Arc<dyn StoreEngine> {
        self.ctx.coordinator.engine()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    /// Number of sessions that are neither committed nor aborted.
    pub fn open_session_count(&self) -> usize {
        self.ctx.registry.len()
    }

    /// Abort every open session idle for longer than the configured lease.
    /// Returns how many were aborted. Does nothing without a lease.
    pub fn reap_expired(&self) -> usize {
        let Some(lease) = self.ctx.config.session_lease() else {
            return 0;
        };
        let mut reaped = 0;
        for session in self.ctx.registry.sessions() {
            if !session.is_open() || session.idle_for() < lease {
                continue;
            }
            // Loses quietly to a concurrent commit or abort.
            if session.abort().is_ok() {
                warn!(
                    session = %session.session_id(),
                    object = %session.ocfl_object_id(),
                    "expired session reaped"
                );
                reaped += 1;
            }
        }
        reaped
    }

    /// Abort every open session. Returns how many were aborted.
    pub fn close(&self) -> usize {
        let aborted = self
            .ctx
            .registry
            .sessions()
            .iter()
            .filter(|session| session.abort().is_ok())
            .count();
        info!(aborted, "session factory closed");
        aborted
    }
}

impl OcflObjectSessionFactory for DefaultSessionFactory {
    fn new_session(&self, object_id: &OcflObjectId) -> SessionResult<Arc<OcflObjectSession>> {
        let baseline = self.ctx.coordinator.engine().current_version(object_id)?;
        loop {
            let session = Arc::new(OcflObjectSession::new(
                object_id.clone(),
                baseline,
                self.ctx.clone(),
            ));
            if self.ctx.registry.insert_if_absent(session.clone()) {
                info!(
                    session = %session.session_id(),
                    object = %object_id,
                    baseline = ?baseline,
                    "session opened"
                );
                return Ok(session);
            }
        }
    }

    fn existing_session(&self, session_id: &SessionId) -> Option<Arc<OcflObjectSession>> {
        self.ctx
            .registry
            .get(session_id)
            .filter(|session| !session.state().is_terminal())
    }
}

impl std::fmt::Debug for DefaultSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultSessionFactory")
            .field("open_sessions", &self.open_session_count())
            .field("config", &self.ctx.config)
            .finish()
    }
}
