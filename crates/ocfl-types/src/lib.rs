//! Foundation types for OCFL object sessions.
//!
//! This crate provides the identifier, header, and content types shared by
//! the store engine boundary, the staging area, and the session layer. Every
//! other crate in the workspace depends on `ocfl-types`.
//!
//! # Key Types
//!
//! - [`OcflObjectId`]: Stable external name of a versioned object
//! - [`ResourceId`]: Identifier of a resource stored inside an object
//! - [`SessionId`]: UUID v7 session identifier
//! - [`VersionNum`]: OCFL-style version number (`v1`, `v2`, ...)
//! - [`ContentDigest`]: BLAKE3 digest of resource content
//! - [`ResourceHeaders`]: Per-resource metadata record
//! - [`ResourceContent`]: Content bytes paired with their headers
//! - [`ResourceOperation`]: A pending mutation of one resource

pub mod digest;
pub mod error;
pub mod id;
pub mod resource;
pub mod version;

pub use digest::ContentDigest;
pub use error::TypeError;
pub use id::{OcflObjectId, ResourceId, SessionId, ACL_SUFFIX};
pub use resource::{InteractionModel, ResourceContent, ResourceHeaders, ResourceOperation};
pub use version::{VersionAuthor, VersionNum};
