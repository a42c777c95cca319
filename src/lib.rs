//! Anchor Splice: structural text patching with literal anchors.
//!
//! Splices fixed blocks of text into existing documents by locating an
//! anchor and inserting or replacing content around it, and leaves the
//! document completely untouched when the anchor cannot be found.
//!
//! # Architecture
//!
//! Both operations compile down to a single primitive: locate a [`Span`],
//! then splice it. Intelligence lives in span acquisition (literal anchor
//! search, pattern-delimited boundary search), not in application logic.
//!
//! - **Anchored insertion** places a payload immediately before the first
//!   occurrence of a literal marker.
//! - **Delimited replacement** replaces the region from a start marker up
//!   to the first subsequent match of a boundary pattern; the boundary's
//!   own text is located, never consumed, so it survives the splice.
//!
//! Documents are immutable value objects: a failed match constructs no new
//! Document, making "no-op on failure" structural. Persistence goes through
//! an injected [`DocumentSink`]; the file-backed sink commits atomically
//! (tempfile + fsync + rename).
//!
//! # Example
//!
//! ```
//! use anchor_splice::{Document, Marker, PatchOutcome, PatchRequest};
//!
//! let doc = Document::from("abc\nMARK\ndef");
//! let request = PatchRequest::Insert {
//!     marker: Marker::new("MARK").unwrap(),
//!     payload: "X\n".to_string(),
//! };
//!
//! match request.apply(&doc).unwrap() {
//!     PatchOutcome::Applied { document, .. } => {
//!         assert_eq!(document.as_str(), "abc\nX\nMARK\ndef");
//!     }
//!     PatchOutcome::AlreadyApplied { .. } => unreachable!(),
//! }
//! ```

pub mod config;
pub mod diagnose;
pub mod document;
pub mod engine;
pub mod locate;
pub mod runner;
pub mod safety;

// Re-exports
pub use config::{
    apply_all, check_all, load_from_path, load_from_str, ApplicationError, ConfigError,
    PatchStatus, SpliceConfig,
};
pub use diagnose::{nearest_match, NearMiss};
pub use document::{Document, Span};
pub use engine::{PatchOutcome, PatchRequest, SpanCheck};
pub use locate::{BoundaryPattern, LocateError, Marker};
pub use runner::{
    run, run_guarded, DocumentSink, FileSink, MemorySink, RunError, RunReport, SinkError,
};
pub use safety::{RootGuard, SafetyError};
