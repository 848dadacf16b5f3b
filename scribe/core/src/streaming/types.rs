//! Streaming Types
//!
//! Value types shared by the segmenters, the pipeline and the dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The terminal sentinel sent to clients after a clean stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// How accumulated provider text is cut into segments
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMode {
    /// Complete sentences ending in `.`, `!` or `?`
    #[default]
    Sentence,
    /// Complete flat `{...}` JSON objects
    Json,
}

impl fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sentence => write!(f, "sentence"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// One complete, emission-ready unit of output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    mode: SegmentMode,
    text: String,
}

impl Segment {
    /// A trimmed sentence
    pub fn sentence(text: impl Into<String>) -> Self {
        Self {
            mode: SegmentMode::Sentence,
            text: text.into(),
        }
    }

    /// A canonical JSON re-serialization
    pub fn json(text: impl Into<String>) -> Self {
        Self {
            mode: SegmentMode::Json,
            text: text.into(),
        }
    }

    /// Which segmenter produced this segment
    #[must_use]
    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    /// The segment text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume the segment, returning its text
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Errors that end a stream
///
/// Every variant is local to one request. On the wire all of them look the
/// same: a single `{"error": ...}` object and no sentinel.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The provider stream could not be opened
    #[error("An error occurred: {0}")]
    ProviderConnection(String),

    /// The provider failed while deltas were being read
    #[error("An error occurred: {0}")]
    ProviderMidStream(String),

    /// The first content of the stream was a refusal
    #[error("An error occurred: {preamble} phrase detected")]
    RefusalDetected {
        /// The preamble that matched
        preamble: String,
    },

    /// The request could not be turned into a provider call
    #[error("{0}")]
    InvalidPrompt(String),
}

/// One item produced by the dispatcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamItem {
    /// A complete segment
    Segment(Segment),
    /// The stream completed cleanly; always the last item
    Done {
        /// Concatenation of everything that was yielded
        final_response: String,
    },
    /// The stream was aborted; always the last item
    Error(StreamError),
}

impl StreamItem {
    /// Whether this item ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Segment(_))
    }
}

/// Per-request stream bookkeeping
#[derive(Clone, Debug, Default)]
pub struct StreamState {
    mode: SegmentMode,
    final_response: String,
    segments_emitted: usize,
    refusal_checked: bool,
}

impl StreamState {
    /// Fresh state for one stream
    #[must_use]
    pub fn new(mode: SegmentMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Active segmentation mode
    #[must_use]
    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    /// Everything yielded so far
    #[must_use]
    pub fn final_response(&self) -> &str {
        &self.final_response
    }

    /// Number of segments yielded so far
    #[must_use]
    pub fn segments_emitted(&self) -> usize {
        self.segments_emitted
    }

    /// Whether the refusal check has already been spent
    #[must_use]
    pub fn refusal_checked(&self) -> bool {
        self.refusal_checked
    }

    pub(crate) fn mark_refusal_checked(&mut self) {
        self.refusal_checked = true;
    }

    /// Record a segment that is about to be yielded mid-stream
    pub(crate) fn record(&mut self, segment: &Segment) {
        self.final_response.push_str(segment.as_str());
        self.final_response.push(' ');
        self.segments_emitted += 1;
    }

    /// Record the end-of-stream flush, which carries no separator
    pub(crate) fn record_final(&mut self, segment: &Segment) {
        self.final_response.push_str(segment.as_str());
        self.segments_emitted += 1;
    }

    /// Consume the state, returning the reconstructed response
    #[must_use]
    pub fn into_final_response(self) -> String {
        self.final_response
    }
}
