//! Case-insensitive segment search and match highlighting.
//!
//! Matching is done over a lowercased shadow of the text with a byte-offset
//! map back into the original string, so every span boundary lands on a
//! `char` boundary of the original. That keeps RTL and multi-byte text (the
//! primary use case is Farsi) intact: spans concatenate back to the input
//! exactly and never split a code point.

use serde::Serialize;

use crate::segments::Segment;

/// One run of text in a highlighted string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// The run's text, with original casing preserved.
    pub text: String,
    /// Whether this run matched the query.
    pub is_match: bool,
}

/// Filter segments whose text contains `query`, case-insensitively.
///
/// An empty query matches everything: filtering with no query entered must
/// show the full transcript, not nothing.
pub fn search<'a>(segments: &'a [Segment], query: &str) -> Vec<&'a Segment> {
    if query.is_empty() {
        return segments.iter().collect();
    }
    let needle = lowercase(query);
    segments
        .iter()
        .filter(|segment| lowercase(segment.text()).contains(&needle))
        .collect()
}

/// Split `text` into spans annotated with whether they matched `query`.
///
/// Concatenating the returned span texts reconstructs `text` exactly. An
/// empty query yields a single non-match span covering the whole text.
pub fn highlight(text: &str, query: &str) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }
    if query.is_empty() {
        return vec![Span {
            text: text.to_owned(),
            is_match: false,
        }];
    }

    let needle = lowercase(query);
    let (haystack, offsets) = lowercase_with_offsets(text);

    let mut spans = Vec::new();
    let mut original_cursor = 0usize;
    let mut lowered_cursor = 0usize;

    while let Some(found) = haystack[lowered_cursor..].find(&needle) {
        let match_start = lowered_cursor + found;
        let match_end = match_start + needle.len();

        // Map lowered byte positions back to original char boundaries.
        let original_start = offsets[match_start];
        let original_end = end_offset(&offsets, text, match_end);

        // A match can begin mid-way through a multi-char lowercase expansion
        // (e.g. the dotted capital I). Snap to the enclosing original char so
        // spans stay boundary-aligned, skipping degenerate zero-width hits.
        if original_end <= original_start {
            lowered_cursor = match_end.max(lowered_cursor + 1);
            continue;
        }

        if original_start > original_cursor {
            spans.push(Span {
                text: text[original_cursor..original_start].to_owned(),
                is_match: false,
            });
        }
        spans.push(Span {
            text: text[original_start.max(original_cursor)..original_end].to_owned(),
            is_match: true,
        });

        original_cursor = original_end;
        lowered_cursor = match_end;
    }

    if original_cursor < text.len() {
        spans.push(Span {
            text: text[original_cursor..].to_owned(),
            is_match: false,
        });
    }

    spans
}

fn lowercase(text: &str) -> String {
    text.to_lowercase()
}

/// Lowercase `text` char-by-char, recording for each byte of the lowered
/// string the byte offset of the original char it came from.
fn lowercase_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut lowered = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    for (original_offset, ch) in text.char_indices() {
        for lowered_ch in ch.to_lowercase() {
            let before = lowered.len();
            lowered.push(lowered_ch);
            for _ in before..lowered.len() {
                offsets.push(original_offset);
            }
        }
    }
    (lowered, offsets)
}

/// Original byte offset just past the char that produced lowered byte
/// `lowered_end - 1`.
fn end_offset(offsets: &[usize], original: &str, lowered_end: usize) -> usize {
    if lowered_end == 0 {
        return 0;
    }
    let last_char_start = offsets[lowered_end - 1];
    let ch = original[last_char_start..]
        .chars()
        .next()
        .map_or(0, char::len_utf8);
    last_char_start + ch
}
