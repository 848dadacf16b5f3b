//! Segmenter Trait
//!
//! A segmenter looks at the accumulated buffer and splits it into complete
//! segments plus a remainder that must wait for more deltas. Segmenters are
//! stateless; the buffer and the per-stream bookkeeping live elsewhere, so
//! one segmenter value can serve any number of streams.

use super::json::JsonSegmenter;
use super::sentence::SentenceSegmenter;
use super::types::{Segment, SegmentMode};

/// Result of one extraction pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Complete segments, in the order their text appeared
    pub segments: Vec<Segment>,
    /// Text that is not complete yet
    pub remainder: String,
}

impl Extraction {
    /// Nothing complete; the whole buffer stays
    #[must_use]
    pub fn pending(remainder: impl Into<String>) -> Self {
        Self {
            segments: Vec::new(),
            remainder: remainder.into(),
        }
    }
}

/// Split policy applied to the accumulation buffer
pub trait Segmenter: Send + Sync {
    /// Which mode this segmenter implements
    fn mode(&self) -> SegmentMode;

    /// Pull every complete segment out of `buffer`
    fn extract(&self, buffer: &str) -> Extraction;

    /// End-of-stream rule for whatever is left in the buffer
    fn flush(&self, remainder: &str) -> Option<Segment>;
}

/// Options shared by the built-in segmenters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmenterOptions {
    /// Rewrite raw `"\n\n"` to the escaped `\n\n` before splitting sentences
    pub escape_paragraph_breaks: bool,
}

impl Default for SegmenterOptions {
    fn default() -> Self {
        Self {
            escape_paragraph_breaks: true,
        }
    }
}

/// Build the segmenter for a mode
#[must_use]
pub fn segmenter_for(mode: SegmentMode, options: SegmenterOptions) -> Box<dyn Segmenter> {
    match mode {
        SegmentMode::Sentence => Box::new(
            SentenceSegmenter::new().with_paragraph_escaping(options.escape_paragraph_breaks),
        ),
        SegmentMode::Json => Box::new(JsonSegmenter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmenter_for_mode() {
        let options = SegmenterOptions::default();
        assert_eq!(
            segmenter_for(SegmentMode::Sentence, options).mode(),
            SegmentMode::Sentence
        );
        assert_eq!(
            segmenter_for(SegmentMode::Json, options).mode(),
            SegmentMode::Json
        );
    }
}
