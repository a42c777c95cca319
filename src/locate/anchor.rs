use super::errors::LocateError;
use crate::document::{Document, Span};

/// A literal character sequence used for exact matching.
///
/// Matching is first-occurrence, left-to-right, case-sensitive. Markers are
/// non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker(String);

impl Marker {
    pub fn new(text: impl Into<String>) -> Result<Self, LocateError> {
        let text = text.into();
        if text.is_empty() {
            return Err(LocateError::EmptyMarker);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Locate the insertion point at the first occurrence of `marker`.
///
/// Returns the empty span `[i, i)` where `i` is the index of the first
/// character of the first literal occurrence, scanning from byte 0. The
/// document may be any length, including zero. No side effects.
pub fn locate(document: &Document, marker: &Marker) -> Result<Span, LocateError> {
    document
        .find(marker.as_str())
        .map(Span::at)
        .ok_or_else(|| LocateError::MarkerNotFound {
            marker: marker.as_str().to_string(),
        })
}
