use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use ocfl_staging::StagingError;
use ocfl_store::StoreError;
use ocfl_types::{OcflObjectId, ResourceId, SessionId, VersionNum};

use crate::state::SessionState;

/// Errors surfaced by session and factory operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The resource has neither a staged nor a committed representation.
    #[error("resource not found: {0}")]
    NotFound(ResourceId),

    /// The operation requires a state the session is not in.
    #[error("session {session} is {state}; cannot {operation}")]
    InvalidState {
        session: SessionId,
        state: SessionState,
        operation: &'static str,
    },

    /// Malformed input. Nothing was staged.
    #[error("invalid operation on {resource}: {reason}")]
    Validation { resource: ResourceId, reason: String },

    /// The object advanced past the session's baseline. The session stays
    /// open with its staged operations intact and its baseline moved to
    /// `current`.
    #[error("commit conflict on {object}: session based on {baseline:?}, object is at {current:?}")]
    CommitConflict {
        object: OcflObjectId,
        baseline: Option<VersionNum>,
        current: Option<VersionNum>,
    },

    /// Another session held the object's commit lock for too long.
    #[error("timed out after {waited:?} waiting for the commit lock on {object}")]
    LockTimeout {
        object: OcflObjectId,
        waited: Duration,
    },

    /// The store engine failed. Fatal to the session when
    /// [`StoreError::is_fatal`] holds.
    #[error("store engine failure: {0}")]
    Store(StoreError),
}

impl SessionError {
    /// Whether this error forced the session into a terminal state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_fatal())
    }
}

impl From<StagingError> for SessionError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::Validation { resource, reason } => Self::Validation { resource, reason },
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                object,
                expected,
                actual,
            } => Self::CommitConflict {
                object,
                baseline: expected,
                current: actual,
            },
            other => Self::Store(other),
        }
    }
}

/// Convenience alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors loading a [`SessionConfig`](crate::SessionConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
