//! The object session.
//!
//! An [`OcflObjectSession`] stages mutations of one OCFL object and commits
//! them as a single new version, or discards them. Sessions are shared as
//! `Arc<OcflObjectSession>` between the caller and the registry; all mutable
//! state sits behind one mutex, so a session may be driven from any thread.
//!
//! Reads are layered: a resource with a staged operation is answered from the
//! staging area, anything else falls through to the object's head version in
//! the store engine.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use ocfl_staging::StagingArea;
use ocfl_store::{StoreEngine, VersionDetails};
use ocfl_types::{
    InteractionModel, OcflObjectId, ResourceContent, ResourceHeaders, ResourceId,
    ResourceOperation, SessionId, VersionAuthor, VersionNum,
};

use crate::config::SessionConfig;
use crate::coordinator::{CommitCoordinator, VersionMetadata};
use crate::error::{SessionError, SessionResult};
use crate::registry::SessionRegistry;
use crate::state::SessionState;

/// Collaborators shared by every session of one factory.
pub(crate) struct SessionContext {
    pub(crate) coordinator: CommitCoordinator,
    pub(crate) registry: Arc<dyn SessionRegistry>,
    pub(crate) config: SessionConfig,
}

impl SessionContext {
    fn engine(&self) -> &dyn StoreEngine {
        self.coordinator.engine().as_ref()
    }
}

struct SessionInner {
    state: SessionState,
    staging: StagingArea,
    /// Head version of the object when the session last synchronized with
    /// the engine.
    baseline: Option<VersionNum>,
    metadata: VersionMetadata,
    last_touched: Instant,
}

/// A staging session bound to one OCFL object.
pub struct OcflObjectSession {
    id: SessionId,
    object_id: OcflObjectId,
    ctx: Arc<SessionContext>,
    inner: Mutex<SessionInner>,
}

impl OcflObjectSession {
    pub(crate) fn new(
        object_id: OcflObjectId,
        baseline: Option<VersionNum>,
        ctx: Arc<SessionContext>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            object_id,
            ctx,
            inner: Mutex::new(SessionInner {
                state: SessionState::Open,
                staging: StagingArea::new(),
                baseline,
                metadata: VersionMetadata::default(),
                last_touched: Instant::now(),
            }),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    pub fn ocfl_object_id(&self) -> &OcflObjectId {
        &self.object_id
    }

    // ---------------------------------------------------------------
    // Staging
    // ---------------------------------------------------------------

    /// Stage an RDF resource (container or description).
    pub fn write_rdf_resource(&self, content: ResourceContent) -> SessionResult<()> {
        self.write(InteractionModel::Rdf, content)
    }

    /// Stage a binary.
    pub fn write_non_rdf_resource(&self, content: ResourceContent) -> SessionResult<()> {
        self.write(InteractionModel::NonRdf, content)
    }

    /// Stage the ACL of an RDF source. The identifier must end with
    /// [`ACL_SUFFIX`](ocfl_types::ACL_SUFFIX).
    pub fn write_acl_rdf_resource(&self, content: ResourceContent) -> SessionResult<()> {
        self.write(InteractionModel::AclRdf, content)
    }

    /// Stage the ACL of a binary. The identifier must end with
    /// [`ACL_SUFFIX`](ocfl_types::ACL_SUFFIX).
    pub fn write_acl_non_rdf_resource(&self, content: ResourceContent) -> SessionResult<()> {
        self.write(InteractionModel::AclNonRdf, content)
    }

    fn write(&self, model: InteractionModel, content: ResourceContent) -> SessionResult<()> {
        let mut inner = self.open_for("write")?;
        let resource_id = content.headers.id.clone();
        inner
            .staging
            .stage(resource_id, ResourceOperation::Write { model, content })?;
        Ok(())
    }

    /// Stage removal of a resource's content file, keeping `headers`.
    ///
    /// The headers are the caller's account of the resource after deletion.
    /// They are staged as a tombstone: marked deleted, with the content
    /// digest, size and path cleared. Fails with [`SessionError::NotFound`]
    /// if the resource is neither staged nor committed.
    pub fn delete_content_file(&self, headers: ResourceHeaders) -> SessionResult<()> {
        let mut inner = self.open_for("delete content")?;
        let resource_id = headers.id.clone();
        let at = headers.last_modified;
        let headers = headers.into_deleted(at);
        let exists = match inner.staging.get(&resource_id) {
            Some(ResourceOperation::DeleteHeaders) => false,
            Some(_) => true,
            None => self
                .engine_call(&mut inner, "delete content", |engine, object| {
                    engine.read_headers(object, &resource_id, None)
                })?
                .is_some(),
        };
        if !exists {
            return Err(SessionError::NotFound(resource_id));
        }
        inner
            .staging
            .stage(resource_id, ResourceOperation::DeleteContent { headers })?;
        Ok(())
    }

    /// Stage removal of a resource's headers file.
    ///
    /// Only valid once no content remains: content staged in this session
    /// or still present in the head version is a validation error.
    pub fn delete_header_file(&self, resource_id: &ResourceId) -> SessionResult<()> {
        let mut inner = self.open_for("delete headers")?;
        if inner.staging.get(resource_id).is_none() {
            let committed = self.engine_call(&mut inner, "delete headers", |engine, object| {
                engine.read_headers(object, resource_id, None)
            })?;
            match committed {
                None => return Err(SessionError::NotFound(resource_id.clone())),
                Some(headers) if !headers.deleted && headers.content_path.is_some() => {
                    return Err(SessionError::Validation {
                        resource: resource_id.clone(),
                        reason: "committed content still exists; delete the content file first"
                            .into(),
                    });
                }
                Some(_) => {}
            }
        }
        inner
            .staging
            .stage(resource_id.clone(), ResourceOperation::DeleteHeaders)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Layered reads
    // ---------------------------------------------------------------

    /// Headers of a resource as this session sees it.
    pub fn read_resource_headers(&self, resource_id: &ResourceId) -> SessionResult<ResourceHeaders> {
        let mut inner = self.open_for("read headers")?;
        match inner.staging.get(resource_id) {
            Some(op) => op
                .headers()
                .cloned()
                .ok_or_else(|| SessionError::NotFound(resource_id.clone())),
            None => self
                .engine_call(&mut inner, "read headers", |engine, object| {
                    engine.read_headers(object, resource_id, None)
                })?
                .ok_or_else(|| SessionError::NotFound(resource_id.clone())),
        }
    }

    /// Headers and content of a resource as this session sees it.
    ///
    /// A resource whose content was deleted is [`SessionError::NotFound`];
    /// a headers-only resource is returned with `content: None`.
    pub fn read_content(&self, resource_id: &ResourceId) -> SessionResult<ResourceContent> {
        let mut inner = self.open_for("read content")?;
        let found = match inner.staging.get(resource_id) {
            Some(ResourceOperation::Write { content, .. }) => Some(content.clone()),
            Some(_) => None,
            None => self.engine_call(&mut inner, "read content", |engine, object| {
                engine.read_content(object, resource_id, None)
            })?,
        };
        found
            .filter(|content| !content.headers.deleted)
            .ok_or_else(|| SessionError::NotFound(resource_id.clone()))
    }

    /// Headers of a resource in a committed version, ignoring staging.
    pub fn read_headers_at(
        &self,
        resource_id: &ResourceId,
        version: VersionNum,
    ) -> SessionResult<ResourceHeaders> {
        let mut inner = self.open_for("read headers")?;
        self.engine_call(&mut inner, "read headers", |engine, object| {
            engine.read_headers(object, resource_id, Some(version))
        })?
        .ok_or_else(|| SessionError::NotFound(resource_id.clone()))
    }

    /// Headers and content of a resource in a committed version, ignoring
    /// staging.
    pub fn read_content_at(
        &self,
        resource_id: &ResourceId,
        version: VersionNum,
    ) -> SessionResult<ResourceContent> {
        let mut inner = self.open_for("read content")?;
        self.engine_call(&mut inner, "read content", |engine, object| {
            engine.read_content(object, resource_id, Some(version))
        })?
        .filter(|content| !content.headers.deleted)
        .ok_or_else(|| SessionError::NotFound(resource_id.clone()))
    }

    /// Committed history of the object, oldest first.
    pub fn list_versions(&self) -> SessionResult<Vec<VersionDetails>> {
        let mut inner = self.open_for("list versions")?;
        self.engine_call(&mut inner, "list versions", |engine, object| {
            engine.list_versions(object)
        })
    }

    // ---------------------------------------------------------------
    // Version metadata
    // ---------------------------------------------------------------

    /// Creation timestamp of the version this session will commit. Defaults
    /// to the time of commit.
    pub fn version_creation_timestamp<Tz: TimeZone>(
        &self,
        timestamp: DateTime<Tz>,
    ) -> SessionResult<()> {
        let mut inner = self.open_for("set version timestamp")?;
        inner.metadata.created = Some(timestamp.with_timezone(&Utc));
        Ok(())
    }

    pub fn version_author(
        &self,
        name: impl Into<String>,
        address: Option<String>,
    ) -> SessionResult<()> {
        let mut inner = self.open_for("set version author")?;
        inner.metadata.author = Some(VersionAuthor::new(name, address));
        Ok(())
    }

    pub fn version_message(&self, message: impl Into<String>) -> SessionResult<()> {
        let mut inner = self.open_for("set version message")?;
        inner.metadata.message = Some(message.into());
        Ok(())
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Commit the staged operations as a new version of the object.
    ///
    /// Returns the new version, or `None` when nothing was staged (no version
    /// is created). On [`SessionError::CommitConflict`] the session stays
    /// open with its staging intact and its baseline moved to the observed
    /// head, so a retry commits on top of it. Fatal engine failures abort
    /// the session; any other failure leaves it open.
    pub fn commit(&self) -> SessionResult<Option<VersionNum>> {
        let (operations, baseline, metadata) = {
            let mut inner = self.open_for("commit")?;
            self.advance(&mut inner, SessionState::Committing, "commit")?;
            let mut metadata = inner.metadata.clone();
            if metadata.author.is_none() {
                metadata.author = self.ctx.config.default_author.clone();
            }
            (inner.staging.to_operations(), inner.baseline, metadata)
        };

        if operations.is_empty() {
            let mut inner = self.lock();
            self.advance(&mut inner, SessionState::Committed, "commit")?;
            drop(inner);
            self.ctx.registry.remove(&self.id);
            info!(session = %self.id, object = %self.object_id, "committed with no changes");
            return Ok(None);
        }

        let staged = operations.len();
        let unwinding = ReopenOnUnwind { session: self };
        let result = self
            .ctx
            .coordinator
            .commit(&self.object_id, baseline, operations, metadata);
        drop(unwinding);

        let mut inner = self.lock();
        match result {
            Ok(version) => {
                inner.staging.clear();
                inner.baseline = Some(version);
                self.advance(&mut inner, SessionState::Committed, "commit")?;
                drop(inner);
                self.ctx.registry.remove(&self.id);
                info!(
                    session = %self.id,
                    object = %self.object_id,
                    %version,
                    operations = staged,
                    "committed"
                );
                Ok(Some(version))
            }
            Err(SessionError::CommitConflict {
                object,
                baseline,
                current,
            }) => {
                inner.baseline = current;
                inner.last_touched = Instant::now();
                self.advance(&mut inner, SessionState::Open, "commit")?;
                Err(SessionError::CommitConflict {
                    object,
                    baseline,
                    current,
                })
            }
            Err(err) if err.is_fatal() => {
                self.terminate(&mut inner, &err, "commit")?;
                Err(err)
            }
            Err(err) => {
                warn!(session = %self.id, object = %self.object_id, error = %err, "commit failed");
                inner.last_touched = Instant::now();
                self.advance(&mut inner, SessionState::Open, "commit")?;
                Err(err)
            }
        }
    }

    /// Discard everything staged and close the session. Durable state is
    /// never touched.
    pub fn abort(&self) -> SessionResult<()> {
        let mut inner = self.open_for("abort")?;
        let discarded = inner.staging.len();
        inner.staging.clear();
        self.advance(&mut inner, SessionState::Aborted, "abort")?;
        drop(inner);
        self.ctx.registry.remove(&self.id);
        info!(session = %self.id, object = %self.object_id, discarded, "aborted");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------

    pub fn is_open(&self) -> bool {
        self.lock().state.is_open()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// The head version this session's next commit is checked against.
    pub fn baseline(&self) -> Option<VersionNum> {
        self.lock().baseline
    }

    /// Identifiers with a pending operation, in replay order.
    pub fn staged_resource_ids(&self) -> Vec<ResourceId> {
        self.lock().staging.resource_ids()
    }

    pub fn has_staged_changes(&self) -> bool {
        !self.lock().staging.is_empty()
    }

    /// Time since the last operation on this session.
    pub fn idle_for(&self) -> Duration {
        self.lock().last_touched.elapsed()
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("lock poisoned")
    }

    fn open_for(&self, operation: &'static str) -> SessionResult<MutexGuard<'_, SessionInner>> {
        let mut inner = self.lock();
        if !inner.state.is_open() {
            return Err(SessionError::InvalidState {
                session: self.id,
                state: inner.state,
                operation,
            });
        }
        inner.last_touched = Instant::now();
        Ok(inner)
    }

    /// Move to `next`, or fail with [`SessionError::InvalidState`] naming
    /// `operation` if the state machine forbids it.
    fn advance(
        &self,
        inner: &mut SessionInner,
        next: SessionState,
        operation: &'static str,
    ) -> SessionResult<()> {
        let state = inner
            .state
            .transition(next)
            .map_err(|state| SessionError::InvalidState {
                session: self.id,
                state,
                operation,
            })?;
        debug!(session = %self.id, from = %inner.state, to = %state, "state change");
        inner.state = state;
        Ok(())
    }

    /// Run an engine call, aborting the session if the engine reports the
    /// object as corrupt or gone.
    fn engine_call<T>(
        &self,
        inner: &mut SessionInner,
        operation: &'static str,
        call: impl FnOnce(&dyn StoreEngine, &OcflObjectId) -> ocfl_store::StoreResult<T>,
    ) -> SessionResult<T> {
        match call(self.ctx.engine(), &self.object_id) {
            Ok(value) => Ok(value),
            Err(err) => {
                let err = SessionError::from(err);
                if err.is_fatal() {
                    self.terminate(inner, &err, operation)?;
                }
                Err(err)
            }
        }
    }

    fn terminate(
        &self,
        inner: &mut SessionInner,
        err: &SessionError,
        operation: &'static str,
    ) -> SessionResult<()> {
        inner.staging.clear();
        self.advance(inner, SessionState::Aborted, operation)?;
        self.ctx.registry.remove(&self.id);
        warn!(session = %self.id, object = %self.object_id, error = %err, "session aborted");
        Ok(())
    }
}

/// Returns a session to `Open` if a commit unwinds while it is `Committing`,
/// so it can still be retried, aborted or reaped.
struct ReopenOnUnwind<'a> {
    session: &'a OcflObjectSession,
}

impl Drop for ReopenOnUnwind<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let mut inner = match self.session.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.state == SessionState::Committing {
            inner.state = SessionState::Open;
            inner.last_touched = Instant::now();
            warn!(
                session = %self.session.id,
                object = %self.session.object_id,
                "commit unwound; session reopened"
            );
        }
    }
}

impl std::fmt::Debug for OcflObjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcflObjectSession")
            .field("id", &self.id)
            .field("object_id", &self.object_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::factory::{DefaultSessionFactory, OcflObjectSessionFactory};
    use ocfl_store::InMemoryStoreEngine;

    fn open_session() -> (DefaultSessionFactory, Arc<OcflObjectSession>) {
        let factory = DefaultSessionFactory::new(
            Arc::new(InMemoryStoreEngine::new()),
            SessionConfig::default(),
        );
        let session = factory
            .new_session(&OcflObjectId::new("obj1").unwrap())
            .unwrap();
        (factory, session)
    }

    #[test]
    fn legal_transition_is_applied() {
        let (_factory, session) = open_session();
        let mut inner = session.lock();
        session
            .advance(&mut inner, SessionState::Committing, "commit")
            .unwrap();
        assert_eq!(inner.state, SessionState::Committing);
    }

    #[test]
    fn illegal_transition_is_reported_and_not_applied() {
        let (_factory, session) = open_session();
        let mut inner = session.lock();
        inner.state = SessionState::Committed;
        let err = session
            .advance(&mut inner, SessionState::Open, "commit")
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                state: SessionState::Committed,
                operation: "commit",
                ..
            }
        ));
        assert_eq!(inner.state, SessionState::Committed);
    }

    #[test]
    fn unwinding_commit_reopens_the_session() {
        let (_factory, session) = open_session();
        session.lock().state = SessionState::Committing;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _reopen = ReopenOnUnwind { session: &session };
            panic!("engine failed mid-commit");
        }));
        assert!(outcome.is_err());
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn reopen_guard_is_inert_without_a_panic() {
        let (_factory, session) = open_session();
        session.lock().state = SessionState::Committing;
        drop(ReopenOnUnwind { session: &session });
        assert_eq!(session.state(), SessionState::Committing);
    }
}
