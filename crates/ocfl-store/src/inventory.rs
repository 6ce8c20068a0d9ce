//! The version inventory of one object and the replay of staged operations
//! into a pending version.
//!
//! An [`Inventory`] records every version's resource state (resource id →
//! headers) plus a content-addressed manifest (digest → stored path). New
//! versions are prepared as a [`PendingVersion`] without touching the
//! inventory; the engine decides how to make the pending version durable and
//! only then calls [`Inventory::seal`].

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use ocfl_types::{
    ContentDigest, OcflObjectId, ResourceHeaders, ResourceId, ResourceOperation, VersionNum,
};

use crate::error::{StoreError, StoreResult};
use crate::layout::ContentLayout;
use crate::version::{VersionDetails, VersionInfo, VersionRequest};

/// Resource state of one version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionState {
    pub info: VersionInfo,
    pub resources: BTreeMap<ResourceId, ResourceHeaders>,
}

/// Complete version history of one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: OcflObjectId,
    pub head: VersionNum,
    /// Content digest → stored path, relative to the object root.
    pub manifest: BTreeMap<ContentDigest, String>,
    pub versions: BTreeMap<VersionNum, VersionState>,
}

/// Content that a pending version introduces to the object.
#[derive(Clone, Debug)]
pub struct NewContent {
    pub digest: ContentDigest,
    /// Stored path relative to the object root, e.g. `v2/content/obj1/file1`.
    pub stored_path: String,
    pub bytes: Bytes,
}

/// A fully replayed version that is not yet durable.
#[derive(Clone, Debug)]
pub struct PendingVersion {
    pub number: VersionNum,
    pub state: VersionState,
    pub new_content: Vec<NewContent>,
}

impl Inventory {
    /// State of `version`, or of the head when `version` is `None`.
    pub fn state(&self, version: Option<VersionNum>) -> StoreResult<&VersionState> {
        let number = version.unwrap_or(self.head);
        self.versions
            .get(&number)
            .ok_or_else(|| StoreError::VersionNotFound {
                object: self.id.clone(),
                version: number,
            })
    }

    /// Headers of one resource as of `version`.
    pub fn headers(
        &self,
        resource_id: &ResourceId,
        version: Option<VersionNum>,
    ) -> StoreResult<Option<&ResourceHeaders>> {
        Ok(self.state(version)?.resources.get(resource_id))
    }

    /// Stored path of the content with the given digest.
    pub fn stored_path(&self, digest: &ContentDigest) -> StoreResult<&str> {
        self.manifest
            .get(digest)
            .map(String::as_str)
            .ok_or_else(|| StoreError::CorruptObject {
                object: self.id.clone(),
                reason: format!("digest {digest} missing from manifest"),
            })
    }

    /// History of the object, oldest first.
    pub fn details(&self) -> Vec<VersionDetails> {
        self.versions
            .iter()
            .map(|(number, state)| VersionDetails {
                number: *number,
                info: state.info.clone(),
                resource_count: state.resources.len(),
            })
            .collect()
    }

    /// Check that the head and the recorded versions agree.
    pub fn validate(&self) -> StoreResult<()> {
        let last = self.versions.keys().next_back().copied();
        if last != Some(self.head) {
            return Err(StoreError::CorruptObject {
                object: self.id.clone(),
                reason: format!("head {} is not the latest recorded version", self.head),
            });
        }
        for (expected, actual) in (1u32..).zip(self.versions.keys()) {
            if actual.number() != expected {
                return Err(StoreError::CorruptObject {
                    object: self.id.clone(),
                    reason: format!("version history has a gap before {actual}"),
                });
            }
        }
        Ok(())
    }

    /// Record a pending version as the new head.
    pub fn seal(&mut self, pending: &PendingVersion) {
        for content in &pending.new_content {
            self.manifest
                .entry(content.digest)
                .or_insert_with(|| content.stored_path.clone());
        }
        self.versions.insert(pending.number, pending.state.clone());
        self.head = pending.number;
    }

    /// The inventory of a brand-new object whose first version is `pending`.
    pub fn genesis(id: OcflObjectId, pending: &PendingVersion) -> Self {
        let mut inventory = Self {
            id,
            head: pending.number,
            manifest: BTreeMap::new(),
            versions: BTreeMap::new(),
        };
        inventory.seal(pending);
        inventory
    }
}

/// Replay `request` on top of `inventory` (absent for a new object).
///
/// Verifies the request's base against the current head first. Nothing is
/// mutated; the result describes the version to be written.
pub fn prepare_version(
    inventory: Option<&Inventory>,
    request: &VersionRequest,
) -> StoreResult<PendingVersion> {
    let head = inventory.map(|inv| inv.head);
    if head != request.base {
        if inventory.is_none() {
            return Err(StoreError::ObjectMissing(request.object_id.clone()));
        }
        return Err(StoreError::Conflict {
            object: request.object_id.clone(),
            expected: request.base,
            actual: head,
        });
    }

    let number = VersionNum::after(head);
    let mut resources = match inventory {
        Some(inv) => inv.state(None)?.resources.clone(),
        None => BTreeMap::new(),
    };
    let mut new_content: Vec<NewContent> = Vec::new();
    let mut introduced: HashSet<ContentDigest> = HashSet::new();

    for (resource_id, operation) in &request.operations {
        match operation {
            ResourceOperation::Write { model, content } => {
                let mut headers = content.headers.clone();
                headers.interaction_model = *model;
                headers.deleted = false;
                match &content.content {
                    Some(bytes) => {
                        let digest = ContentDigest::of(bytes);
                        if let Some(expected) = headers.content_digest {
                            if expected != digest {
                                return Err(StoreError::DigestMismatch {
                                    resource: resource_id.clone(),
                                    expected,
                                    computed: digest,
                                });
                            }
                        }
                        let content_path = ContentLayout::content_path(resource_id, *model);
                        let known = inventory.is_some_and(|inv| inv.manifest.contains_key(&digest));
                        if !known && introduced.insert(digest) {
                            new_content.push(NewContent {
                                digest,
                                stored_path: format!("{number}/content/{content_path}"),
                                bytes: bytes.clone(),
                            });
                        }
                        headers.content_digest = Some(digest);
                        headers.content_size = Some(bytes.len() as u64);
                        headers.content_path = Some(content_path);
                    }
                    None => {
                        headers.content_path = None;
                    }
                }
                resources.insert(resource_id.clone(), headers);
            }
            ResourceOperation::DeleteContent { headers } => {
                let headers = headers.clone();
                let at = headers.last_modified;
                resources.insert(resource_id.clone(), headers.into_deleted(at));
            }
            // Drops the resource from the state. The session only stages this
            // once no content remains.
            ResourceOperation::DeleteHeaders => {
                resources.remove(resource_id);
            }
        }
    }

    Ok(PendingVersion {
        number,
        state: VersionState {
            info: request.info.clone(),
            resources,
        },
        new_content,
    })
}
