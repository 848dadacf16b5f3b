//! Wire Messages
//!
//! The client-facing shape of a stream. Every item is one JSON object:
//!
//! ```text
//! {"chunk": "The cat sat."}
//! {"chunk": "The dog ran."}
//! {"chunk": "[DONE]"}
//! ```
//!
//! or, when the stream fails, a single `{"error": "..."}` and nothing after
//! it. In JSON mode the chunk value is the canonical object text, still as a
//! string. Objects are written with `": "` after keys so a line reads the
//! same as the segments inside it.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::streaming::{canonical_json, StreamItem, DONE_SENTINEL};

/// One client-facing stream message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireChunk {
    /// A segment or the `[DONE]` sentinel
    Chunk {
        /// Segment text or sentinel
        chunk: String,
    },
    /// The stream failed
    Error {
        /// Human-readable reason
        error: String,
    },
}

impl WireChunk {
    /// A segment chunk
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { chunk: text.into() }
    }

    /// An error chunk
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// The completion sentinel
    #[must_use]
    pub fn done() -> Self {
        Self::chunk(DONE_SENTINEL)
    }

    /// Whether this is the sentinel
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Chunk { chunk } if chunk == DONE_SENTINEL)
    }

    /// Whether nothing may follow this message
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_done() || matches!(self, Self::Error { .. })
    }

    /// The message as a JSON object
    #[must_use]
    pub fn to_json(&self) -> String {
        let value = match self {
            Self::Chunk { chunk } => json!({ "chunk": chunk }),
            Self::Error { error } => json!({ "error": error }),
        };
        canonical_json(&value)
    }

    /// The message as one newline-terminated NDJSON line
    #[must_use]
    pub fn to_ndjson_line(&self) -> String {
        let mut line = self.to_json();
        line.push('\n');
        line
    }
}

impl From<StreamItem> for WireChunk {
    fn from(item: StreamItem) -> Self {
        match item {
            StreamItem::Segment(segment) => Self::chunk(segment.into_string()),
            StreamItem::Done { .. } => Self::done(),
            StreamItem::Error(error) => Self::error(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::{Segment, StreamError};

    #[test]
    fn test_wire_format() {
        assert_eq!(
            WireChunk::chunk("The cat sat.").to_ndjson_line(),
            "{\"chunk\": \"The cat sat.\"}\n"
        );
        assert_eq!(WireChunk::done().to_json(), r#"{"chunk": "[DONE]"}"#);
        assert_eq!(
            WireChunk::error("An error occurred: boom").to_json(),
            r#"{"error": "An error occurred: boom"}"#
        );
    }

    #[test]
    fn test_json_segment_is_a_string_value() {
        let wire = WireChunk::from(StreamItem::Segment(Segment::json(r#"{"a": 1}"#)));
        assert_eq!(wire.to_json(), r#"{"chunk": "{\"a\": 1}"}"#);
    }

    #[test]
    fn test_from_stream_items() {
        let done = WireChunk::from(StreamItem::Done {
            final_response: "ignored".into(),
        });
        assert!(done.is_done());
        assert!(done.is_terminal());

        let error = WireChunk::from(StreamItem::Error(StreamError::RefusalDetected {
            preamble: "I'm sorry".into(),
        }));
        assert_eq!(error, WireChunk::error("An error occurred: I'm sorry phrase detected"));
        assert!(error.is_terminal());

        assert!(!WireChunk::chunk("Hi.").is_terminal());
    }

    #[test]
    fn test_round_trips_through_serde() {
        let parsed: WireChunk = serde_json::from_str(r#"{"error": "nope"}"#).unwrap();
        assert_eq!(parsed, WireChunk::error("nope"));
    }
}
