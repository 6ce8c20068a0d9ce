use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use bytes::Bytes;
use tracing::debug;

use ocfl_types::{
    ContentDigest, OcflObjectId, ResourceContent, ResourceHeaders, ResourceId, VersionNum,
};

use crate::error::{StoreError, StoreResult};
use crate::inventory::{prepare_version, Inventory};
use crate::traits::StoreEngine;
use crate::version::{VersionDetails, VersionRequest};

struct MemoryObject {
    inventory: Inventory,
    content: HashMap<ContentDigest, Bytes>,
    corruption: Option<String>,
}

impl MemoryObject {
    fn check(&self) -> StoreResult<()> {
        match &self.corruption {
            Some(reason) => Err(StoreError::CorruptObject {
                object: self.inventory.id.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// In-memory, HashMap-based store engine.
///
/// Intended for tests and embedding. Every object is held in memory behind a
/// `RwLock`; a version is prepared in full before the write lock publishes
/// it, so readers never observe a half-applied version. The engine also
/// exposes fault hooks ([`fail_next_commit`](Self::fail_next_commit),
/// [`mark_corrupted`](Self::mark_corrupted),
/// [`remove_object`](Self::remove_object)) for exercising failure paths.
pub struct InMemoryStoreEngine {
    objects: RwLock<HashMap<OcflObjectId, MemoryObject>>,
    injected_failure: Mutex<Option<StoreError>>,
}

impl InMemoryStoreEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            injected_failure: Mutex::new(None),
        }
    }

    /// Number of objects currently stored.
    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Number of distinct content blobs stored for an object.
    pub fn content_count(&self, object_id: &OcflObjectId) -> usize {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(object_id)
            .map(|obj| obj.content.len())
            .unwrap_or(0)
    }

    /// Make the next `materialize_version` call fail with `error` without
    /// touching any object.
    pub fn fail_next_commit(&self, error: StoreError) {
        *self.injected_failure.lock().expect("lock poisoned") = Some(error);
    }

    /// Flag an object as corrupted; every later access to it fails with
    /// [`StoreError::CorruptObject`].
    pub fn mark_corrupted(&self, object_id: &OcflObjectId, reason: impl Into<String>) -> bool {
        let mut map = self.objects.write().expect("lock poisoned");
        match map.get_mut(object_id) {
            Some(obj) => {
                obj.corruption = Some(reason.into());
                true
            }
            None => false,
        }
    }

    /// Drop an object entirely. Returns `true` if it existed.
    pub fn remove_object(&self, object_id: &OcflObjectId) -> bool {
        self.objects
            .write()
            .expect("lock poisoned")
            .remove(object_id)
            .is_some()
    }

    /// A clone of an object's inventory.
    pub fn inventory(&self, object_id: &OcflObjectId) -> StoreResult<Option<Inventory>> {
        let map = self.objects.read().expect("lock poisoned");
        match map.get(object_id) {
            Some(obj) => {
                obj.check()?;
                Ok(Some(obj.inventory.clone()))
            }
            None => Ok(None),
        }
    }
}

impl Default for InMemoryStoreEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreEngine for InMemoryStoreEngine {
    fn current_version(&self, object_id: &OcflObjectId) -> StoreResult<Option<VersionNum>> {
        let map = self.objects.read().expect("lock poisoned");
        match map.get(object_id) {
            Some(obj) => {
                obj.check()?;
                Ok(Some(obj.inventory.head))
            }
            None => Ok(None),
        }
    }

    fn materialize_version(&self, request: &VersionRequest) -> StoreResult<VersionNum> {
        if let Some(error) = self.injected_failure.lock().expect("lock poisoned").take() {
            return Err(error);
        }

        let mut map = self.objects.write().expect("lock poisoned");
        let existing = map.get(&request.object_id);
        if let Some(obj) = existing {
            obj.check()?;
        }
        let pending = prepare_version(existing.map(|obj| &obj.inventory), request)?;

        match map.get_mut(&request.object_id) {
            Some(obj) => {
                obj.inventory.seal(&pending);
                for new in &pending.new_content {
                    obj.content.insert(new.digest, new.bytes.clone());
                }
            }
            None => {
                let content = pending
                    .new_content
                    .iter()
                    .map(|new| (new.digest, new.bytes.clone()))
                    .collect();
                map.insert(
                    request.object_id.clone(),
                    MemoryObject {
                        inventory: Inventory::genesis(request.object_id.clone(), &pending),
                        content,
                        corruption: None,
                    },
                );
            }
        }

        debug!(
            object = %request.object_id,
            version = %pending.number,
            operations = request.operations.len(),
            "version sealed"
        );
        Ok(pending.number)
    }

    fn read_headers(
        &self,
        object_id: &OcflObjectId,
        resource_id: &ResourceId,
        version: Option<VersionNum>,
    ) -> StoreResult<Option<ResourceHeaders>> {
        let map = self.objects.read().expect("lock poisoned");
        let Some(obj) = map.get(object_id) else {
            return Ok(None);
        };
        obj.check()?;
        Ok(obj.inventory.headers(resource_id, version)?.cloned())
    }

    fn read_content(
        &self,
        object_id: &OcflObjectId,
        resource_id: &ResourceId,
        version: Option<VersionNum>,
    ) -> StoreResult<Option<ResourceContent>> {
        let map = self.objects.read().expect("lock poisoned");
        let Some(obj) = map.get(object_id) else {
            return Ok(None);
        };
        obj.check()?;
        let Some(headers) = obj.inventory.headers(resource_id, version)? else {
            return Ok(None);
        };
        let content = match (headers.deleted, headers.content_digest, &headers.content_path) {
            (false, Some(digest), Some(_)) => {
                let bytes = obj.content.get(&digest).ok_or_else(|| StoreError::CorruptObject {
                    object: object_id.clone(),
                    reason: format!("content {digest} missing"),
                })?;
                Some(bytes.clone())
            }
            _ => None,
        };
        Ok(Some(ResourceContent {
            headers: headers.clone(),
            content,
        }))
    }

    fn list_versions(&self, object_id: &OcflObjectId) -> StoreResult<Vec<VersionDetails>> {
        let map = self.objects.read().expect("lock poisoned");
        match map.get(object_id) {
            Some(obj) => {
                obj.check()?;
                Ok(obj.inventory.details())
            }
            None => Ok(Vec::new()),
        }
    }
}

impl std::fmt::Debug for InMemoryStoreEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStoreEngine")
            .field("object_count", &self.object_count())
            .finish()
    }
}
