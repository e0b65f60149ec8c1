//! Definition documents
//!
//! A system is persisted as one JSON document of flat arrays that refer to
//! each other by index:
//! - version 1: positional records (still written on request)
//! - version 2: named-field records, traversals as progress and multiplier
//!   controls
//! - version 3: named-field records, traversals as explicit start and end
//!   points (the current encoding)

mod build;
mod load;
pub mod schema;

pub use schema::{Document, LegacyDocument};

/// Version written by default.
pub const CURRENT_VERSION: u32 = 3;

/// Positional encoding version.
pub const LEGACY_VERSION: u32 = 1;
