//! Error types for the staging crate.

use ocfl_types::ResourceId;

/// Errors that can occur while staging an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagingError {
    /// The operation is malformed for this resource. Nothing was staged.
    #[error("invalid operation on {resource}: {reason}")]
    Validation { resource: ResourceId, reason: String },
}

impl StagingError {
    pub(crate) fn validation(resource: &ResourceId, reason: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.clone(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for staging results.
pub type StagingResult<T> = Result<T, StagingError>;
