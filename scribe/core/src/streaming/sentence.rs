//! Sentence Segmenter
//!
//! Cuts prose into complete sentences. A sentence ends at `.`, `!` or `?`
//! followed by whitespace; the punctuation stays with the sentence and the
//! whitespace run is dropped. The trailing piece is never complete until the
//! stream ends.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use super::segmenter::{Extraction, Segmenter};
use super::types::{Segment, SegmentMode};

/// Escaped form written in place of a raw paragraph break
pub const ESCAPED_PARAGRAPH_BREAK: &str = "\\n\\n";

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern is valid"))
}

/// Split `text` after every sentence-ending punctuation mark that is
/// followed by whitespace. Always returns at least one piece.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for boundary in sentence_boundary().find_iter(text) {
        // The punctuation mark is a single ASCII byte
        pieces.push(&text[start..=boundary.start()]);
        start = boundary.end();
    }
    pieces.push(&text[start..]);
    pieces
}

/// Sentence-mode segmenter
#[derive(Clone, Debug)]
pub struct SentenceSegmenter {
    escape_paragraph_breaks: bool,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self {
            escape_paragraph_breaks: true,
        }
    }
}

impl SentenceSegmenter {
    /// Segmenter with paragraph-break escaping enabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn paragraph-break escaping on or off
    #[must_use]
    pub fn with_paragraph_escaping(mut self, enabled: bool) -> Self {
        self.escape_paragraph_breaks = enabled;
        self
    }

    fn normalize<'a>(&self, buffer: &'a str) -> Cow<'a, str> {
        if self.escape_paragraph_breaks && buffer.contains("\n\n") {
            Cow::Owned(buffer.replace("\n\n", ESCAPED_PARAGRAPH_BREAK))
        } else {
            Cow::Borrowed(buffer)
        }
    }
}

impl Segmenter for SentenceSegmenter {
    fn mode(&self) -> SegmentMode {
        SegmentMode::Sentence
    }

    fn extract(&self, buffer: &str) -> Extraction {
        let text = self.normalize(buffer);
        let pieces = split_sentences(&text);

        let Some((last, complete)) = pieces.split_last() else {
            return Extraction::pending(text.into_owned());
        };
        if complete.is_empty() {
            return Extraction::pending(text.into_owned());
        }

        Extraction {
            segments: complete
                .iter()
                .map(|piece| Segment::sentence(piece.trim()))
                .collect(),
            remainder: (*last).to_string(),
        }
    }

    fn flush(&self, remainder: &str) -> Option<Segment> {
        let trimmed = remainder.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Segment::sentence(trimmed))
        }
    }
}
