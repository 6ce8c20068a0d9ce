//! Commit coordination.
//!
//! A commit runs under the object's lock:
//! 1. acquire the object's commit lock (bounded by the lock timeout)
//! 2. read the object's head from the engine
//! 3. compare it with the session baseline; a mismatch is a conflict
//! 4. hand the staged operations to the engine as one version request
//! 5. release the lock
//!
//! The lock makes check-then-materialize atomic with respect to other
//! sessions committing through the same coordinator.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use ocfl_store::{StoreEngine, StoreError, VersionInfo, VersionRequest};
use ocfl_types::{OcflObjectId, ResourceId, ResourceOperation, VersionAuthor, VersionNum};

use crate::error::{SessionError, SessionResult};
use crate::locks::ObjectLocks;

/// Version metadata as set on a session. The creation timestamp defaults to
/// the time the commit lock is taken.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionMetadata {
    pub created: Option<DateTime<Utc>>,
    pub author: Option<VersionAuthor>,
    pub message: Option<String>,
}

impl VersionMetadata {
    fn into_info(self) -> VersionInfo {
        VersionInfo {
            created: self.created.unwrap_or_else(Utc::now),
            author: self.author,
            message: self.message,
        }
    }
}

pub struct CommitCoordinator {
    engine: Arc<dyn StoreEngine>,
    locks: ObjectLocks,
    lock_timeout: Duration,
}

impl CommitCoordinator {
    pub fn new(engine: Arc<dyn StoreEngine>, lock_timeout: Duration) -> Self {
        Self {
            engine,
            locks: ObjectLocks::new(),
            lock_timeout,
        }
    }

    pub fn engine(&self) -> &Arc<dyn StoreEngine> {
        &self.engine
    }

    pub fn locks(&self) -> &ObjectLocks {
        &self.locks
    }

    /// Materialize `operations` as the version after `baseline`.
    ///
    /// Returns [`SessionError::CommitConflict`] carrying the observed head if
    /// the object moved. A baseline naming a version of an object that no
    /// longer exists is reported as [`StoreError::ObjectMissing`].
    pub fn commit(
        &self,
        object_id: &OcflObjectId,
        baseline: Option<VersionNum>,
        operations: Vec<(ResourceId, ResourceOperation)>,
        metadata: VersionMetadata,
    ) -> SessionResult<VersionNum> {
        let _guard = self.locks.acquire(object_id, self.lock_timeout)?;

        let current = self.engine.current_version(object_id)?;
        if current != baseline {
            if baseline.is_some() && current.is_none() {
                warn!(object = %object_id, ?baseline, "object vanished under session");
                return Err(SessionError::Store(StoreError::ObjectMissing(
                    object_id.clone(),
                )));
            }
            warn!(object = %object_id, ?baseline, ?current, "commit conflict");
            return Err(SessionError::CommitConflict {
                object: object_id.clone(),
                baseline,
                current,
            });
        }

        let mut request = VersionRequest::new(object_id.clone(), current, metadata.into_info());
        request.operations = operations;
        debug!(
            object = %object_id,
            base = ?current,
            operations = request.operations.len(),
            "materializing version"
        );
        Ok(self.engine.materialize_version(&request)?)
    }
}

impl std::fmt::Debug for CommitCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitCoordinator")
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocfl_store::InMemoryStoreEngine;
    use ocfl_types::{InteractionModel, ResourceContent, ResourceHeaders};

    fn oid() -> OcflObjectId {
        OcflObjectId::new("obj1").unwrap()
    }

    fn write(id: &str, bytes: &[u8]) -> (ResourceId, ResourceOperation) {
        let rid = ResourceId::new(id).unwrap();
        let headers = ResourceHeaders::new(rid.clone(), InteractionModel::NonRdf);
        (
            rid,
            ResourceOperation::Write {
                model: InteractionModel::NonRdf,
                content: ResourceContent::new(headers, bytes.to_vec()),
            },
        )
    }

    fn coordinator(engine: &Arc<InMemoryStoreEngine>) -> CommitCoordinator {
        CommitCoordinator::new(engine.clone(), Duration::from_millis(50))
    }

    #[test]
    fn commits_against_matching_baseline() {
        let engine = Arc::new(InMemoryStoreEngine::new());
        let coord = coordinator(&engine);
        let v1 = coord
            .commit(&oid(), None, vec![write("/obj1/a", b"a")], VersionMetadata::default())
            .unwrap();
        assert_eq!(v1, VersionNum::initial());
        let v2 = coord
            .commit(&oid(), Some(v1), vec![write("/obj1/b", b"b")], VersionMetadata::default())
            .unwrap();
        assert_eq!(v2, v1.next());
        assert!(!coord.locks().is_locked(&oid()));
    }

    #[test]
    fn stale_baseline_conflicts() {
        let engine = Arc::new(InMemoryStoreEngine::new());
        let coord = coordinator(&engine);
        coord
            .commit(&oid(), None, vec![write("/obj1/a", b"a")], VersionMetadata::default())
            .unwrap();

        let err = coord
            .commit(&oid(), None, vec![write("/obj1/b", b"b")], VersionMetadata::default())
            .unwrap_err();
        match err {
            SessionError::CommitConflict { baseline, current, .. } => {
                assert_eq!(baseline, None);
                assert_eq!(current, Some(VersionNum::initial()));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(engine.current_version(&oid()).unwrap(), Some(VersionNum::initial()));
    }

    #[test]
    fn vanished_object_is_fatal() {
        let engine = Arc::new(InMemoryStoreEngine::new());
        let coord = coordinator(&engine);
        let v1 = coord
            .commit(&oid(), None, vec![write("/obj1/a", b"a")], VersionMetadata::default())
            .unwrap();
        engine.remove_object(&oid());

        let err = coord
            .commit(&oid(), Some(v1), vec![], VersionMetadata::default())
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn held_lock_times_out() {
        let engine = Arc::new(InMemoryStoreEngine::new());
        let coord = coordinator(&engine);
        let _guard = coord.locks().acquire(&oid(), Duration::from_millis(10)).unwrap();
        let err = coord
            .commit(&oid(), None, vec![write("/obj1/a", b"a")], VersionMetadata::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::LockTimeout { .. }));
        assert_eq!(engine.current_version(&oid()).unwrap(), None);
    }

    #[test]
    fn metadata_defaults_timestamp() {
        let engine = Arc::new(InMemoryStoreEngine::new());
        let coord = coordinator(&engine);
        let before = Utc::now();
        let metadata = VersionMetadata {
            author: Some(VersionAuthor::new("curator", None)),
            message: Some("initial".into()),
            ..Default::default()
        };
        coord
            .commit(&oid(), None, vec![write("/obj1/a", b"a")], metadata)
            .unwrap();
        let versions = engine.list_versions(&oid()).unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].info.created >= before);
        assert_eq!(versions[0].info.message.as_deref(), Some("initial"));
        assert_eq!(versions[0].info.author.as_ref().unwrap().name, "curator");
    }
}
