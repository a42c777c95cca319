//! Near-miss context for failed matches.
//!
//! When a marker fails to match, the useful diagnostic is where the
//! document *almost* matches: the operator usually holds a stale marker,
//! and the region it drifted from is still recognizable.

use crate::document::Document;

/// The closest candidate region for a marker that failed to match.
#[derive(Debug, Clone, PartialEq)]
pub struct NearMiss {
    pub offset: usize,
    /// 1-based line of the candidate.
    pub line: usize,
    /// 1-based byte column of the candidate.
    pub column: usize,
    /// Jaro-Winkler similarity against the marker, in `[0, 1]`.
    pub similarity: f64,
    /// Surrounding document text, trimmed to a window.
    pub snippet: String,
}

const MIN_SIMILARITY: f64 = 0.6;
const SNIPPET_CONTEXT: usize = 60;

/// Find the region of `document` most similar to `marker`.
///
/// Tries a literal search for shrinking prefixes of the marker first (a
/// stale marker usually drifts at its tail), then falls back to scoring
/// every line. Returns `None` when nothing clears the similarity floor.
pub fn nearest_match(document: &Document, marker: &str) -> Option<NearMiss> {
    prefix_match(document, marker).or_else(|| line_match(document, marker))
}

fn prefix_match(document: &Document, marker: &str) -> Option<NearMiss> {
    // Halve the prefix until something matches literally. A prefix shorter
    // than 4 bytes would match almost anywhere, so stop there.
    let mut len = marker.len() / 2;
    while len >= 4 {
        let prefix = trim_to_char_boundary(marker, len);
        if let Some(offset) = document.find(prefix) {
            return Some(near_miss_at(document, marker, offset));
        }
        len /= 2;
    }
    None
}

fn line_match(document: &Document, marker: &str) -> Option<NearMiss> {
    let target = marker.lines().next().unwrap_or(marker).trim();
    if target.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    let mut offset = 0;
    for line in document.as_str().split_inclusive('\n') {
        let candidate = line.trim_end_matches('\n').trim();
        if !candidate.is_empty() {
            let score = strsim::jaro_winkler(target, candidate);
            if score >= MIN_SIMILARITY && best.is_none_or(|(_, s)| score > s) {
                best = Some((offset, score));
            }
        }
        offset += line.len();
    }

    best.map(|(offset, score)| {
        let mut miss = near_miss_at(document, marker, offset);
        miss.similarity = score;
        miss
    })
}

fn near_miss_at(document: &Document, marker: &str, offset: usize) -> NearMiss {
    let text = document.as_str();
    let window_end = snap_right(text, (offset + marker.len()).min(text.len()));
    let start = snap_left(text, offset.saturating_sub(SNIPPET_CONTEXT));
    let end = snap_right(text, (window_end + SNIPPET_CONTEXT).min(text.len()));
    let (line, column) = document.line_col(offset);

    NearMiss {
        offset,
        line,
        column,
        similarity: strsim::jaro_winkler(marker, &text[offset..window_end]),
        snippet: text[start..end].to_string(),
    }
}

fn trim_to_char_boundary(s: &str, mut len: usize) -> &str {
    while len > 0 && !s.is_char_boundary(len) {
        len -= 1;
    }
    &s[..len]
}

fn snap_left(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn snap_right(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drifted_marker_found_by_prefix() {
        // the document holds an older revision of the marker's tail
        let doc = Document::from("header\n<!-- Home Screen v2 -->\nbody\n");
        let miss = nearest_match(&doc, "<!-- Home Screen (Desktop) -->").unwrap();
        assert_eq!(miss.line, 2);
        assert!(miss.snippet.contains("Home Screen v2"));
    }

    #[test]
    fn test_similar_line_found_by_fuzzy_scan() {
        // no prefix of the marker survives literally, only a similar line
        let doc = Document::from("div {\n}\nsektion.hero-banner {\n}\n");
        let miss = nearest_match(&doc, "section.hero-banner {").unwrap();
        assert_eq!(miss.line, 3);
        assert!(miss.similarity >= 0.6);
    }

    #[test]
    fn test_nothing_similar_returns_none() {
        let doc = Document::from("0123456789\n0123456789\n");
        assert_eq!(nearest_match(&doc, "body.bg-aurora {"), None);
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let doc = Document::from("ééééééé MARKER-ish ééééééé");
        let miss = nearest_match(&doc, "MARKER-like").unwrap();
        assert!(miss.snippet.contains("MARKER-ish"));
    }
}
