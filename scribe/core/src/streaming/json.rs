//! Balanced-Brace JSON Segmenter
//!
//! Pulls complete, flat `{...}` objects out of provider output as soon as
//! their closing brace arrives. Prose before an object is dropped. Only
//! objects without inner braces are recognised; for nested output the
//! innermost flat objects are what gets emitted.
//!
//! Emitted objects are re-serialized in a canonical form: `", "` between
//! items, `": "` between a key and its value, keys in source order.

use std::io;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::segmenter::{Extraction, Segmenter};
use super::types::{Segment, SegmentMode};

fn flat_object() -> &'static Regex {
    static FLAT_OBJECT: OnceLock<Regex> = OnceLock::new();
    FLAT_OBJECT.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("flat object pattern is valid"))
}

fn code_fence_open() -> &'static Regex {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    OPEN.get_or_init(|| Regex::new(r"(?m)^```json\s*").expect("code fence pattern is valid"))
}

fn code_fence_close() -> &'static Regex {
    static CLOSE: OnceLock<Regex> = OnceLock::new();
    CLOSE.get_or_init(|| Regex::new(r"(?m)\s*```$").expect("code fence pattern is valid"))
}

/// Formatter producing `{"a": 1, "b": [1, 2]}`
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize a value in the canonical segment form
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    if let Err(e) = value.serialize(&mut serializer) {
        // In-memory serialization of a Value does not fail in practice
        debug!(error = %e, "Canonical serialization failed, using compact form");
        return value.to_string();
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Strip markdown code fences that models like to wrap JSON in
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    let without_open = code_fence_open().replace_all(text, "");
    let without_close = code_fence_close().replace_all(&without_open, "");
    without_close.trim().to_string()
}

/// JSON-mode segmenter
#[derive(Clone, Debug, Default)]
pub struct JsonSegmenter;

impl JsonSegmenter {
    /// Create the segmenter
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for JsonSegmenter {
    fn mode(&self) -> SegmentMode {
        SegmentMode::Json
    }

    fn extract(&self, buffer: &str) -> Extraction {
        let mut segments = Vec::new();
        let mut rest = buffer;

        while let Some(span) = flat_object().find(rest) {
            match serde_json::from_str::<Value>(span.as_str()) {
                Ok(value) => {
                    segments.push(Segment::json(canonical_json(&value)));
                    rest = &rest[span.end()..];
                }
                Err(e) => {
                    debug!(error = %e, span = span.as_str(), "Brace span is not valid JSON");
                    rest = &rest[span.start()..];
                    break;
                }
            }
        }

        Extraction {
            segments,
            remainder: rest.to_string(),
        }
    }

    fn flush(&self, remainder: &str) -> Option<Segment> {
        let trimmed = remainder.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Some(Segment::json(canonical_json(&value))),
            Err(e) => {
                debug!(error = %e, bytes = trimmed.len(), "Discarding unparsable tail");
                None
            }
        }
    }
}
