//! Splitting example utterances into literal text and entity references.
//!
//! Voiceflow stores slot references inline in an utterance, e.g.
//! `"order a {{[size].abc123}} pizza"`. Dialogflow CX wants the same phrase as an
//! ordered list of parts where annotated parts point at an intent parameter. This module
//! only does the string work; mapping a reference onto a parameter happens in
//! [`crate::transform`].
//!
//! Two marker forms are recognised:
//! - `{{[name].id}}`, as written by the Voiceflow export,
//! - `{name-id}`, a short form where the id follows the last `-`.
//!
//! Anything else, including unbalanced braces, is literal text.

use regex::Regex;
use std::sync::LazyLock;

static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\[(\w{1,64})\]\.(\w{1,64})\}\}|\{([\w-]+)-(\w+)\}")
        .expect("marker pattern is valid")
});

/// One entity reference found in an utterance. `start..end` is the byte range of the raw marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub start: usize,
    pub end: usize,
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Param { name: String, id: String },
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(text.into())
    }

    pub fn param(name: impl Into<String>, id: impl Into<String>) -> Self {
        Segment::Param {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// All markers in order of appearance.
pub fn extract_markers(utterance: &str) -> Vec<Marker> {
    MARKER_PATTERN
        .captures_iter(utterance)
        .filter_map(|captures| {
            let raw = captures.get(0)?;
            let (name, id) = match (captures.get(1), captures.get(2)) {
                (Some(name), Some(id)) => (name, id),
                _ => (captures.get(3)?, captures.get(4)?),
            };
            Some(Marker {
                start: raw.start(),
                end: raw.end(),
                name: name.as_str().to_string(),
                id: id.as_str().to_string(),
            })
        })
        .collect()
}

/// Splits `utterance` into alternating text and parameter segments.
///
/// Empty text is never emitted, so a marker at either end of the string or two adjacent
/// markers produce no text segment in between. Whitespace between markers is kept.
pub fn segment(utterance: &str) -> Vec<Segment> {
    segment_with_source(utterance)
        .into_iter()
        .map(|(segment, _)| segment)
        .collect()
}

/// Like [`segment`], but pairs every segment with the slice of `utterance` it was cut
/// from. For a parameter that slice is the raw marker.
pub fn segment_with_source(utterance: &str) -> Vec<(Segment, &str)> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for marker in extract_markers(utterance) {
        if marker.start > cursor {
            let text = &utterance[cursor..marker.start];
            segments.push((Segment::text(text), text));
        }
        let raw = &utterance[marker.start..marker.end];
        segments.push((
            Segment::Param {
                name: marker.name,
                id: marker.id,
            },
            raw,
        ));
        cursor = marker.end;
    }

    if cursor < utterance.len() {
        let text = &utterance[cursor..];
        segments.push((Segment::text(text), text));
    }

    segments
}
