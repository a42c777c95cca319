//! The patch engine: evaluates a [`PatchRequest`] against a [`Document`].
//!
//! Both operations compile down to a single primitive: locate a span, then
//! splice. Failure never constructs a new Document, so "no-op on failure"
//! is structural rather than a convention.

use xxhash_rust::xxh3::xxh3_64;

use crate::document::{Document, Span};
use crate::locate::{anchor, boundary, BoundaryPattern, LocateError, Marker};

/// One patching operation against exactly one Document.
#[derive(Debug, Clone)]
#[must_use = "a PatchRequest does nothing until applied"]
pub enum PatchRequest {
    /// Insert `payload` immediately before the first occurrence of `marker`.
    Insert { marker: Marker, payload: String },
    /// Replace the span from the start of `start` through (but not
    /// including) the first subsequent match of `boundary` with `payload`.
    Replace {
        start: Marker,
        boundary: BoundaryPattern,
        payload: String,
    },
}

/// Result of a successful application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome should be checked for applied/already-applied"]
pub enum PatchOutcome {
    /// A new Document was produced. `span` is the altered region of the
    /// *input* document: `[i, i)` for an insertion, `[s, e)` for a
    /// replacement.
    Applied { document: Document, span: Span },
    /// Guarded application found the payload already in place; the input
    /// Document is handed back untouched and nothing was constructed.
    AlreadyApplied { document: Document },
}

impl PatchRequest {
    pub fn payload(&self) -> &str {
        match self {
            PatchRequest::Insert { payload, .. } => payload,
            PatchRequest::Replace { payload, .. } => payload,
        }
    }

    /// The marker (or start marker) this request anchors on.
    pub fn marker(&self) -> &Marker {
        match self {
            PatchRequest::Insert { marker, .. } => marker,
            PatchRequest::Replace { start, .. } => start,
        }
    }

    /// The span this request would alter, without altering anything.
    pub fn locate(&self, document: &Document) -> Result<Span, LocateError> {
        match self {
            PatchRequest::Insert { marker, .. } => anchor::locate(document, marker),
            PatchRequest::Replace {
                start, boundary, ..
            } => boundary::locate(document, start, boundary),
        }
    }

    /// Apply this request, producing a new Document.
    ///
    /// Application is all-or-nothing: either a complete new Document is
    /// returned or the error names the marker/pattern that failed to match.
    /// Applying the same Insert to its own output inserts the payload a
    /// second time; use [`PatchRequest::apply_guarded`] when re-runs must be
    /// no-ops.
    pub fn apply(&self, document: &Document) -> Result<PatchOutcome, LocateError> {
        let span = self.locate(document)?;
        Ok(PatchOutcome::Applied {
            document: document.splice(span, self.payload()),
            span,
        })
    }

    /// Apply, but report [`PatchOutcome::AlreadyApplied`] when the payload
    /// is already in place: immediately before the marker occurrence for an
    /// Insert, or filling the replaceable region for a Replace.
    pub fn apply_guarded(&self, document: &Document) -> Result<PatchOutcome, LocateError> {
        let span = self.locate(document)?;

        let in_place = match self {
            PatchRequest::Insert { payload, .. } => {
                document.as_str()[..span.start].ends_with(payload.as_str())
            }
            PatchRequest::Replace { payload, .. } => document.slice(span) == payload,
        };

        if in_place {
            return Ok(PatchOutcome::AlreadyApplied {
                document: document.clone(),
            });
        }

        Ok(PatchOutcome::Applied {
            document: document.splice(span, self.payload()),
            span,
        })
    }
}

/// Expected before-text verification for a span about to be replaced.
///
/// Exact text for small spans, xxh3 hash above 1 KiB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanCheck {
    ExactMatch(String),
    Hash(u64),
}

impl SpanCheck {
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            SpanCheck::Hash(xxh3_64(text.as_bytes()))
        } else {
            SpanCheck::ExactMatch(text.to_string())
        }
    }

    /// Check the located span's current text against the expectation.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            SpanCheck::ExactMatch(expected) => text == expected,
            SpanCheck::Hash(expected) => xxh3_64(text.as_bytes()) == *expected,
        }
    }
}
