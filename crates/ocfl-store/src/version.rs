use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ocfl_types::{OcflObjectId, ResourceId, ResourceOperation, VersionAuthor, VersionNum};

/// Version-level metadata stamped on a sealed version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<VersionAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VersionInfo {
    pub fn new(created: DateTime<Utc>) -> Self {
        Self {
            created,
            author: None,
            message: None,
        }
    }

    pub fn with_author(mut self, author: VersionAuthor) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Summary of one version in an object's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDetails {
    pub number: VersionNum,
    pub info: VersionInfo,
    /// Number of resources (headers files) in the version's state.
    pub resource_count: usize,
}

/// Everything the engine needs to materialize one new version.
#[derive(Clone, Debug)]
pub struct VersionRequest {
    pub object_id: OcflObjectId,
    /// The head version the operations were staged against; `None` for an
    /// object that does not exist yet.
    pub base: Option<VersionNum>,
    /// Operations in the order they are replayed.
    pub operations: Vec<(ResourceId, ResourceOperation)>,
    pub info: VersionInfo,
}

impl VersionRequest {
    pub fn new(object_id: OcflObjectId, base: Option<VersionNum>, info: VersionInfo) -> Self {
        Self {
            object_id,
            base,
            operations: Vec::new(),
            info,
        }
    }

    pub fn with_operation(mut self, resource_id: ResourceId, operation: ResourceOperation) -> Self {
        self.operations.push((resource_id, operation));
        self
    }
}
