//! Span acquisition: literal anchors and pattern-delimited boundaries.
//!
//! All intelligence about *where* to patch lives here; applying a located
//! span is a single splice in the engine.

pub mod anchor;
pub mod boundary;
pub mod errors;

pub use anchor::Marker;
pub use boundary::BoundaryPattern;
pub use errors::LocateError;
