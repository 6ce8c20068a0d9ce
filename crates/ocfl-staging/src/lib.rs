//! Staging area for OCFL object sessions.
//!
//! Accumulates the resource mutations of one session until they are
//! committed as a new object version or discarded.
//!
//! # Key Types
//!
//! - [`StagingArea`] -- pending operations keyed by resource, in replay order
//! - [`StagingError`] -- validation failures; nothing is staged on error

pub mod area;
pub mod error;

pub use area::StagingArea;
pub use error::{StagingError, StagingResult};
