//! Scribe Core - Streaming segmentation for an LLM creative-writing backend
//!
//! This crate holds everything behind the HTTP surface: provider backends,
//! prompt assembly, the writing operations, and the streaming layer that
//! turns a provider's token deltas into complete sentences or complete JSON
//! objects as they arrive.
//!
//! # Architecture
//!
//! ```text
//!  request payload
//!        │
//!        ▼
//!  ┌──────────────┐   PromptSpec   ┌─────────────────┐   ChatRequest   ┌────────────┐
//!  │ WritingService│──────────────▶│ StreamDispatcher│────────────────▶│ LlmBackend │
//!  │  (+ prompts)  │               │  SegmentPipeline│◀── deltas ──────│ (OpenAI,   │
//!  └──────────────┘               └────────┬────────┘                 │  Hermes)   │
//!                                          │ StreamItem                └────────────┘
//!                                          ▼
//!                                   WireChunk lines
//! ```
//!
//! # Module Overview
//!
//! - [`streaming`]: accumulator, segmenters, refusal detector, dispatcher
//! - [`backend`]: provider trait, OpenAI-compatible client, router
//! - [`prompts`]: per-endpoint prompt builders and the prompt library
//! - [`writing`]: validated writing operations
//! - [`requests`]: inbound payload types
//! - [`messages`]: the client-facing wire format
//! - [`config`]: TOML, environment and CLI configuration
//! - [`history`]: flat-file chat history
//! - [`mode`]: the runtime mature-content switch

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod history;
pub mod messages;
pub mod mode;
pub mod prompts;
pub mod requests;
pub mod streaming;
pub mod writing;

// Re-exports for convenience
pub use backend::{
    ChatMessage, ChatRequest, ChatRole, LlmBackend, LlmResponse, OpenAiBackend, ProviderProfile,
    ProviderRoute, ProviderRouter, ScriptedBackend, StreamingToken,
};
pub use config::{
    load_config, load_config_from_path, ConfigError, ConfigOverrides, ConfigSource,
    ScribeConfigFile,
};
pub use history::{HistoryError, HistoryStore};
pub use messages::WireChunk;
pub use mode::MatureMode;
pub use prompts::{PromptEntry, PromptLibrary, PromptLibraryError, PromptSpec};
pub use requests::{
    ChapterSuggestionsRequest, GenerationRequest, ParameterSuggestionRequest,
    PassageRewriteRequest, RawPromptRequest, SectionSummaryRequest, SentenceRewriteRequest,
    StoryContext, SummaryRewriteRequest,
};
pub use streaming::{
    DispatchOptions, Segment, SegmentMode, StreamDispatcher, StreamError, StreamItem,
    DONE_SENTINEL,
};
pub use writing::{PassageRewrite, SegmentStream, ServiceError, WritingService};
