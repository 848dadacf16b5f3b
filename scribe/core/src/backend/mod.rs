//! LLM Backend Integration
//!
//! Abstracted access to chat-completion providers through a common trait.
//!
//! # Available Backends
//!
//! - **OpenAI-compatible**: OpenAI, Lambda-hosted Hermes, or any server that
//!   speaks the `/chat/completions` SSE protocol
//! - **Scripted**: replays canned deltas, for tests and offline runs
//!
//! # Usage
//!
//! ```ignore
//! use scribe_core::backend::{OpenAiBackend, LlmBackend, ProviderProfile};
//!
//! let backend = OpenAiBackend::new(ProviderProfile::default())?;
//! let request = backend.profile().request().with_user("Hello!");
//! let rx = backend.send_streaming(&request).await?;
//! ```

mod openai;
mod router;
mod scripted;
mod traits;

pub use openai::OpenAiBackend;
pub use router::{ProviderRoute, ProviderRouter};
pub use scripted::ScriptedBackend;
pub use traits::{
    ChatMessage, ChatRequest, ChatRole, LlmBackend, LlmResponse, ProviderProfile, StreamingToken,
};
