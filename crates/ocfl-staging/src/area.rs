//! The per-session staging area.
//!
//! The [`StagingArea`] holds at most one pending [`ResourceOperation`] per
//! resource identifier. Staging an operation for an identifier that already
//! has one replaces it and moves the identifier to the end of the replay
//! order, so replay order is the order in which the surviving operations were
//! staged. All operations are in-memory; checks that need committed state
//! (does the resource exist, does committed content remain) belong to the
//! session.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use ocfl_types::{ResourceId, ResourceOperation, ACL_SUFFIX};

use crate::error::{StagingError, StagingResult};

#[derive(Debug, Clone)]
struct StagedEntry {
    seq: u64,
    operation: ResourceOperation,
}

/// Pending operations of one session, keyed by resource identifier.
#[derive(Debug, Clone, Default)]
pub struct StagingArea {
    entries: HashMap<ResourceId, StagedEntry>,
    order: BTreeMap<u64, ResourceId>,
    next_seq: u64,
}

impl StagingArea {
    /// Create an empty staging area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources with a pending operation.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The pending operation for a resource.
    pub fn get(&self, resource_id: &ResourceId) -> Option<&ResourceOperation> {
        self.entries.get(resource_id).map(|entry| &entry.operation)
    }

    pub fn contains(&self, resource_id: &ResourceId) -> bool {
        self.entries.contains_key(resource_id)
    }

    // ---------------------------------------------------------------
    // Stage operations
    // ---------------------------------------------------------------

    /// Record or replace the pending operation for `resource_id`.
    ///
    /// The operation is validated first; on error the staging area is left
    /// unchanged. Returns the operation it superseded, if any.
    pub fn stage(
        &mut self,
        resource_id: ResourceId,
        operation: ResourceOperation,
    ) -> StagingResult<Option<ResourceOperation>> {
        self.validate(&resource_id, &operation)?;

        debug!(resource = %resource_id, op = operation.name(), "staged");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, resource_id.clone());
        match self.entries.insert(resource_id, StagedEntry { seq, operation }) {
            Some(previous) => {
                self.order.remove(&previous.seq);
                Ok(Some(previous.operation))
            }
            None => Ok(None),
        }
    }

    /// Check an operation against the staging rules without recording it.
    pub fn validate(
        &self,
        resource_id: &ResourceId,
        operation: &ResourceOperation,
    ) -> StagingResult<()> {
        match operation {
            ResourceOperation::Write { model, content } => {
                if model.is_acl() && !resource_id.is_acl() {
                    return Err(StagingError::validation(
                        resource_id,
                        format!("ACL identifiers must end with {ACL_SUFFIX:?}"),
                    ));
                }
                if !model.is_acl() && resource_id.is_acl() {
                    return Err(StagingError::validation(
                        resource_id,
                        format!("only ACL resources may end with {ACL_SUFFIX:?}"),
                    ));
                }
                if &content.headers.id != resource_id {
                    return Err(StagingError::validation(
                        resource_id,
                        format!("headers describe {}", content.headers.id),
                    ));
                }
                if content.headers.interaction_model != *model {
                    return Err(StagingError::validation(
                        resource_id,
                        format!(
                            "headers declare {} but the write is {model}",
                            content.headers.interaction_model
                        ),
                    ));
                }
            }
            ResourceOperation::DeleteContent { headers } => {
                if &headers.id != resource_id {
                    return Err(StagingError::validation(
                        resource_id,
                        format!("headers describe {}", headers.id),
                    ));
                }
            }
            ResourceOperation::DeleteHeaders => {
                if self.get(resource_id).is_some_and(ResourceOperation::leaves_content) {
                    return Err(StagingError::validation(
                        resource_id,
                        "content is still staged; delete the content file first",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Drop the pending operation for a resource.
    pub fn unstage(&mut self, resource_id: &ResourceId) -> Option<ResourceOperation> {
        let entry = self.entries.remove(resource_id)?;
        self.order.remove(&entry.seq);
        Some(entry.operation)
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // ---------------------------------------------------------------
    // Replay
    // ---------------------------------------------------------------

    /// Pending operations in replay order.
    pub fn pending_operations(&self) -> impl Iterator<Item = (&ResourceId, &ResourceOperation)> {
        self.order.values().filter_map(move |resource_id| {
            self.entries
                .get(resource_id)
                .map(|entry| (resource_id, &entry.operation))
        })
    }

    /// Identifiers with a pending operation, in replay order.
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.order.values().cloned().collect()
    }

    /// An owned copy of the pending operations in replay order.
    pub fn to_operations(&self) -> Vec<(ResourceId, ResourceOperation)> {
        self.pending_operations()
            .map(|(id, op)| (id.clone(), op.clone()))
            .collect()
    }
}
