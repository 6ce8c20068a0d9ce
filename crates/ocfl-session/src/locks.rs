//! Per-object commit locks.
//!
//! Commits against the same object are serialized; commits against different
//! objects proceed in parallel. Holders release by dropping the guard.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tracing::debug;

use ocfl_types::OcflObjectId;

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Default)]
pub struct ObjectLocks {
    held: Mutex<HashSet<OcflObjectId>>,
    released: Condvar,
}

impl ObjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the object's lock is free, then take it. Fails with
    /// [`SessionError::LockTimeout`] once `timeout` has passed.
    pub fn acquire(
        &self,
        object_id: &OcflObjectId,
        timeout: Duration,
    ) -> SessionResult<ObjectLockGuard<'_>> {
        let held = self.held.lock().expect("lock poisoned");
        let (mut held, _) = self
            .released
            .wait_timeout_while(held, timeout, |held| held.contains(object_id))
            .expect("lock poisoned");
        if held.contains(object_id) {
            return Err(SessionError::LockTimeout {
                object: object_id.clone(),
                waited: timeout,
            });
        }
        held.insert(object_id.clone());
        debug!(object = %object_id, "commit lock acquired");
        Ok(ObjectLockGuard {
            locks: self,
            object_id: object_id.clone(),
        })
    }

    pub fn is_locked(&self, object_id: &OcflObjectId) -> bool {
        self.held.lock().expect("lock poisoned").contains(object_id)
    }
}

/// Holds one object's commit lock until dropped.
#[derive(Debug)]
pub struct ObjectLockGuard<'a> {
    locks: &'a ObjectLocks,
    object_id: OcflObjectId,
}

impl ObjectLockGuard<'_> {
    pub fn object_id(&self) -> &OcflObjectId {
        &self.object_id
    }
}

impl Drop for ObjectLockGuard<'_> {
    fn drop(&mut self) {
        // Release even if another holder panicked.
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.object_id);
        drop(held);
        self.locks.released.notify_all();
        debug!(object = %self.object_id, "commit lock released");
    }
}
