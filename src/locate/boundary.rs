use regex::{Regex, RegexBuilder};

use super::anchor::{self, Marker};
use super::errors::LocateError;
use crate::document::{Document, Span};

/// A pattern locating the end of a replaceable region.
///
/// The pattern is only ever asked *where* it starts matching: that position
/// is the end of the region, and the matched text itself stays in the
/// document untouched. Patterns are compiled in dot-matches-newline mode so
/// a boundary expression may reach across lines.
#[derive(Debug, Clone)]
pub struct BoundaryPattern {
    source: String,
    regex: Regex,
}

impl BoundaryPattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self, LocateError> {
        let source = pattern.into();
        let regex = RegexBuilder::new(&source)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| LocateError::InvalidPattern {
                message: e.to_string(),
            })?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Byte offset where the leftmost match begins, if any.
    fn first_match(&self, haystack: &str) -> Option<usize> {
        self.regex.find(haystack).map(|m| m.start())
    }
}

/// Locate the replaceable region `[marker_start, boundary_start)`.
///
/// Two-phase: the start marker is anchor-located first, then the boundary
/// pattern is searched strictly after the end of the marker occurrence. The
/// leftmost boundary match wins; there is no backtracking to alternative
/// marker occurrences.
pub fn locate(
    document: &Document,
    start: &Marker,
    boundary: &BoundaryPattern,
) -> Result<Span, LocateError> {
    let at = anchor::locate(document, start)?;
    let search_from = at.start + start.as_str().len();
    let tail = &document.as_str()[search_from..];

    match boundary.first_match(tail) {
        Some(offset) => Ok(Span::new(at.start, search_from + offset)),
        None => Err(LocateError::BoundaryNotFound {
            marker: start.as_str().to_string(),
            pattern: boundary.as_str().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(s: &str) -> Marker {
        Marker::new(s).unwrap()
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = BoundaryPattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, LocateError::InvalidPattern { .. }));
    }

    #[test]
    fn test_locate_region() {
        let doc = Document::from("<a>old</a><b>");
        let boundary = BoundaryPattern::new("<b>").unwrap();
        let span = locate(&doc, &marker("<a>"), &boundary).unwrap();
        assert_eq!(span, Span::new(0, 10));
        assert_eq!(doc.slice(span), "<a>old</a>");
    }

    #[test]
    fn test_boundary_text_is_not_consumed() {
        let doc = Document::from("start middle END tail");
        let boundary = BoundaryPattern::new("END").unwrap();
        let span = locate(&doc, &marker("start"), &boundary).unwrap();
        assert_eq!(&doc.as_str()[span.end..], "END tail");
    }

    #[test]
    fn test_leftmost_boundary_wins() {
        let doc = Document::from("Mxx|yy|zz");
        let boundary = BoundaryPattern::new(r"\|").unwrap();
        let span = locate(&doc, &marker("M"), &boundary).unwrap();
        assert_eq!(span, Span::new(0, 3));
    }

    #[test]
    fn test_search_starts_after_marker() {
        // A boundary that would match inside the marker itself is ignored.
        let doc = Document::from("a|b more |c");
        let boundary = BoundaryPattern::new(r"\|").unwrap();
        let span = locate(&doc, &marker("a|b"), &boundary).unwrap();
        assert_eq!(span, Span::new(0, 9));
    }

    #[test]
    fn test_boundary_may_span_lines() {
        let doc = Document::from("<section>\nbody\n</section>\n<nav>");
        let boundary = BoundaryPattern::new(r"</section>.*<nav>").unwrap();
        let span = locate(&doc, &marker("<section>"), &boundary).unwrap();
        assert_eq!(doc.slice(span), "<section>\nbody\n");
    }

    #[test]
    fn test_start_marker_absent() {
        let doc = Document::from("nothing to see");
        let boundary = BoundaryPattern::new("x").unwrap();
        let err = locate(&doc, &marker("<a>"), &boundary).unwrap_err();
        assert!(matches!(err, LocateError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_boundary_absent_names_both() {
        let doc = Document::from("<a>old and nothing else");
        let boundary = BoundaryPattern::new("<b>").unwrap();
        let err = locate(&doc, &marker("<a>"), &boundary).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("<a>"));
        assert!(message.contains("<b>"));
    }
}
