//! Versioned object store engines for OCFL object sessions.
//!
//! The session layer treats the store engine as an external collaborator: it
//! stages and orders changes, the engine makes them durable. This crate
//! defines that boundary and ships two engines.
//!
//! # Engine Capabilities
//!
//! All engines implement the [`StoreEngine`] trait:
//!
//! - materialize a new version from a base version, a list of resource
//!   operations, and version metadata (or report a conflict)
//! - read headers and content as of any retained version
//! - report the current head version
//!
//! # Engines
//!
//! - [`InMemoryStoreEngine`] -- `HashMap`-based engine for tests and embedding
//! - [`FsStoreEngine`] -- version directories on disk, published atomically
//!
//! # Design Rules
//!
//! 1. Sealed versions are immutable; prior versions are never rewritten.
//! 2. Prepare-then-publish: a version is fully replayed before it becomes
//!    visible.
//! 3. Content is deduplicated by digest within an object.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod inventory;
pub mod layout;
pub mod memory;
pub mod traits;
pub mod version;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use fs::FsStoreEngine;
pub use inventory::{Inventory, PendingVersion, VersionState};
pub use layout::ContentLayout;
pub use memory::InMemoryStoreEngine;
pub use traits::StoreEngine;
pub use version::{VersionDetails, VersionInfo, VersionRequest};
