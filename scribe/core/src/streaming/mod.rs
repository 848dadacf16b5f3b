//! Streaming Segmentation
//!
//! Turns a provider's delta stream into complete, client-ready segments.
//!
//! # Architecture
//!
//! ```text
//! LlmBackend ──deltas──▶ StreamDispatcher ──▶ SegmentPipeline
//!                              │                 ├─ ChunkAccumulator
//!                              │                 ├─ RefusalDetector
//!                              │                 └─ Segmenter (sentence | json)
//!                              ▼
//!                    Stream<Item = StreamItem>
//! ```
//!
//! The pipeline is synchronous and owns all per-stream state. The
//! dispatcher is the async shell around it: it opens the provider stream,
//! feeds deltas in, and hands segments out one poll at a time.
//!
//! # Modes
//!
//! - **Sentence**: split after `.`, `!` or `?` followed by whitespace
//! - **JSON**: extract flat `{...}` objects, re-serialized canonically

mod accumulator;
mod dispatcher;
mod json;
mod pipeline;
mod refusal;
mod segmenter;
mod sentence;
mod types;


pub use accumulator::ChunkAccumulator;
pub use dispatcher::{DispatchOptions, StreamDispatcher, INVALID_PROMPT_MESSAGE};
pub use json::{canonical_json, strip_code_fences, JsonSegmenter};
pub use pipeline::SegmentPipeline;
pub use refusal::{RefusalDetector, RefusalVerdict, DEFAULT_REFUSAL_PREAMBLE};
pub use segmenter::{segmenter_for, Extraction, Segmenter, SegmenterOptions};
pub use sentence::{SentenceSegmenter, ESCAPED_PARAGRAPH_BREAK};
pub use types::{Segment, SegmentMode, StreamError, StreamItem, StreamState, DONE_SENTINEL};
