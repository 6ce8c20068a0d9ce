use ocfl_types::{ContentDigest, OcflObjectId, ResourceId, VersionNum};

/// Errors from store engine operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object's head moved past the version the caller based its
    /// changes on.
    #[error("version conflict on {object}: expected head {expected:?}, found {actual:?}")]
    Conflict {
        object: OcflObjectId,
        expected: Option<VersionNum>,
        actual: Option<VersionNum>,
    },

    /// An object that was expected to exist is gone.
    #[error("object {0} no longer exists")]
    ObjectMissing(OcflObjectId),

    /// The requested version is not part of the object's history.
    #[error("version {version} not found in object {object}")]
    VersionNotFound {
        object: OcflObjectId,
        version: VersionNum,
    },

    /// Stored content does not hash to its recorded digest (data corruption).
    #[error("hash mismatch for {path}: expected {expected}, computed {computed}")]
    HashMismatch {
        path: String,
        expected: ContentDigest,
        computed: ContentDigest,
    },

    /// Content handed to the engine does not match the digest asserted in
    /// its headers.
    #[error("digest mismatch for {resource}: headers assert {expected}, content hashes to {computed}")]
    DigestMismatch {
        resource: ResourceId,
        expected: ContentDigest,
        computed: ContentDigest,
    },

    /// The object's inventory or layout is malformed.
    #[error("corrupt object {object}: {reason}")]
    CorruptObject { object: OcflObjectId, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this failure means the object can no longer be trusted, as
    /// opposed to a failure the caller may retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ObjectMissing(_) | Self::HashMismatch { .. } | Self::CorruptObject { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        let object = OcflObjectId::new("obj1").unwrap();
        assert!(StoreError::ObjectMissing(object.clone()).is_fatal());
        assert!(StoreError::CorruptObject {
            object: object.clone(),
            reason: "bad inventory".into()
        }
        .is_fatal());

        let conflict = StoreError::Conflict {
            object,
            expected: None,
            actual: Some(VersionNum::initial()),
        };
        assert!(!conflict.is_fatal());
        assert!(conflict.is_conflict());
        assert!(!StoreError::Io(std::io::Error::other("disk full")).is_fatal());
    }
}
