//! Lookup of live sessions by identifier.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ocfl_types::SessionId;

use crate::session::OcflObjectSession;

/// Storage for the sessions a factory has handed out.
///
/// Terminal sessions are removed by the session itself, so everything a
/// registry holds is open or committing.
pub trait SessionRegistry: Send + Sync {
    /// Insert unless the identifier is taken. Returns `true` if inserted.
    fn insert_if_absent(&self, session: Arc<OcflObjectSession>) -> bool;

    fn get(&self, session_id: &SessionId) -> Option<Arc<OcflObjectSession>>;

    fn remove(&self, session_id: &SessionId) -> Option<Arc<OcflObjectSession>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the registered sessions.
    fn sessions(&self) -> Vec<Arc<OcflObjectSession>>;
}

/// `HashMap`-backed registry.
#[derive(Default)]
pub struct InMemorySessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<OcflObjectSession>>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn insert_if_absent(&self, session: Arc<OcflObjectSession>) -> bool {
        let mut sessions = self.sessions.write().expect("lock poisoned");
        let id = *session.session_id();
        if sessions.contains_key(&id) {
            return false;
        }
        sessions.insert(id, session);
        true
    }

    fn get(&self, session_id: &SessionId) -> Option<Arc<OcflObjectSession>> {
        self.sessions
            .read()
            .expect("lock poisoned")
            .get(session_id)
            .cloned()
    }

    fn remove(&self, session_id: &SessionId) -> Option<Arc<OcflObjectSession>> {
        self.sessions
            .write()
            .expect("lock poisoned")
            .remove(session_id)
    }

    fn len(&self) -> usize {
        self.sessions.read().expect("lock poisoned").len()
    }

    fn sessions(&self) -> Vec<Arc<OcflObjectSession>> {
        self.sessions
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for InMemorySessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionRegistry")
            .field("len", &self.len())
            .finish()
    }
}
