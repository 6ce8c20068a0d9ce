//! Session-based staging and atomic commit over versioned OCFL objects.
//!
//! A caller opens an [`OcflObjectSession`] on an object through an
//! [`OcflObjectSessionFactory`], stages writes and deletes, optionally sets
//! version metadata, and then either commits the batch as one new version or
//! aborts it. Commits to one object are serialized by a per-object lock and
//! checked against the head the session was opened on; a session that lost
//! the race gets [`SessionError::CommitConflict`] and keeps its staging.
//!
//! # Key Types
//!
//! - [`DefaultSessionFactory`] -- creates sessions and looks them up by id
//! - [`OcflObjectSession`] -- staging, layered reads, commit and abort
//! - [`CommitCoordinator`] -- lock, conflict check, hand-off to the engine
//! - [`ObjectLocks`] -- keyed commit locks with bounded waits
//! - [`SessionRegistry`] -- pluggable store of live sessions
//! - [`SessionConfig`] -- lock timeout, session lease, default author

pub mod config;
pub mod coordinator;
pub mod error;
pub mod factory;
pub mod locks;
pub mod registry;
pub mod session;
pub mod state;

pub use config::SessionConfig;
pub use coordinator::{CommitCoordinator, VersionMetadata};
pub use error::{ConfigError, SessionError, SessionResult};
pub use factory::{DefaultSessionFactory, OcflObjectSessionFactory};
pub use locks::{ObjectLockGuard, ObjectLocks};
pub use registry::{InMemorySessionRegistry, SessionRegistry};
pub use session::OcflObjectSession;
pub use state::SessionState;
