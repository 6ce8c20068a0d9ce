use ocfl_types::{OcflObjectId, ResourceContent, ResourceHeaders, ResourceId, VersionNum};

use crate::error::StoreResult;
use crate::version::{VersionDetails, VersionRequest};

/// Versioned object store engine.
///
/// The session layer stages and orders changes; the engine owns digesting,
/// layout, and durable version history. All implementations must satisfy
/// these invariants:
/// - A sealed version is immutable. Prior versions are never mutated or
///   deleted.
/// - `materialize_version` is all-or-nothing: on error the object's head and
///   every existing version are exactly as before.
/// - `materialize_version` rejects a request whose `base` is not the current
///   head with [`StoreError::Conflict`](crate::StoreError::Conflict).
/// - Reads of a missing object or resource return `Ok(None)`; `Err` is
///   reserved for I/O failure and corruption.
pub trait StoreEngine: Send + Sync {
    /// The head version of an object, or `None` if it does not exist.
    fn current_version(&self, object_id: &OcflObjectId) -> StoreResult<Option<VersionNum>>;

    /// Replay the request's operations into a new version and seal it.
    /// Returns the number of the new version.
    fn materialize_version(&self, request: &VersionRequest) -> StoreResult<VersionNum>;

    /// Headers of a resource as of `version` (the head when `None`).
    fn read_headers(
        &self,
        object_id: &OcflObjectId,
        resource_id: &ResourceId,
        version: Option<VersionNum>,
    ) -> StoreResult<Option<ResourceHeaders>>;

    /// Headers and content of a resource as of `version` (the head when
    /// `None`). A resource without a content file is returned with
    /// `content: None`.
    fn read_content(
        &self,
        object_id: &OcflObjectId,
        resource_id: &ResourceId,
        version: Option<VersionNum>,
    ) -> StoreResult<Option<ResourceContent>>;

    /// Version history of an object, oldest first. Empty if it does not exist.
    fn list_versions(&self, object_id: &OcflObjectId) -> StoreResult<Vec<VersionDetails>>;

    /// Check whether an object exists.
    fn object_exists(&self, object_id: &OcflObjectId) -> StoreResult<bool> {
        Ok(self.current_version(object_id)?.is_some())
    }

    /// Whether the head version holds a content file for the resource.
    fn contains_content(
        &self,
        object_id: &OcflObjectId,
        resource_id: &ResourceId,
    ) -> StoreResult<bool> {
        Ok(self
            .read_headers(object_id, resource_id, None)?
            .is_some_and(|headers| !headers.deleted && headers.content_path.is_some()))
    }
}
