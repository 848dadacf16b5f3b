//! LLM Backend Traits
//!
//! The streaming core only needs an ordered sequence of text deltas and an
//! observable end of stream. [`LlmBackend`] is that contract; concrete
//! providers translate their wire format into [`StreamingToken`]s.
//!
//! # Requests
//!
//! A [`ChatRequest`] is the assembled conversation: a system prompt,
//! optional few-shot examples and the user prompt. Builders keep call sites
//! short:
//!
//! ```ignore
//! let request = ChatRequest::new("gpt-4o-mini")
//!     .with_system("You are a novelist.")
//!     .with_user("Continue the chapter.")
//!     .with_max_tokens(1000);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Token stream events from LLM backends
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamingToken {
    /// A content delta
    Token(String),
    /// The provider signalled the end of the stream
    Complete {
        /// Every delta concatenated
        message: String,
    },
    /// The provider failed mid-stream
    Error(String),
}

/// Author of a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions for the model
    System,
    /// End-user turn
    User,
    /// Model turn
    Assistant,
}

/// One message in a chat completion request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    /// Model identifier understood by the provider
    pub model: String,
    /// Conversation, system message first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,
    /// Completion token limit (0 = provider default)
    pub max_tokens: u32,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl ChatRequest {
    /// Empty request for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set or replace the system prompt
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let message = ChatMessage::system(system);
        match self.messages.first_mut() {
            Some(first) if first.role == ChatRole::System => *first = message,
            _ => self.messages.insert(0, message),
        }
        self
    }

    /// Add a few-shot example pair
    #[must_use]
    pub fn with_example(
        mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> Self {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
        self
    }

    /// Append the user prompt
    #[must_use]
    pub fn with_user(mut self, prompt: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(prompt));
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The system prompt, if any
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
    }

    /// The final user prompt, if any
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }

    /// Whether there is nothing for the model to answer
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.prompt().map_or(true, |p| p.trim().is_empty())
    }
}

/// Response from a non-streaming request
#[derive(Clone, Debug)]
pub struct LlmResponse {
    /// The response text
    pub content: String,
    /// Model that generated the response
    pub model: String,
    /// Tokens used (if reported)
    pub tokens_used: Option<u32>,
    /// Response generation time in milliseconds
    pub duration_ms: Option<u64>,
}

/// LLM Backend trait
///
/// Implement this trait to add support for different LLM providers.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Backend name for logs (e.g. "OpenAI")
    fn name(&self) -> &str;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Open a streaming completion
    ///
    /// An `Err` means the stream could not be opened. Once open, deltas
    /// arrive on the receiver in provider order, followed by exactly one
    /// `Complete` or `Error`. Dropping the receiver stops the stream.
    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamingToken>>;

    /// Send a request and wait for the complete response
    async fn send(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse>;
}

/// Connection settings for one provider
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderProfile {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Bearer token, if the provider needs one
    pub api_key: Option<String>,
    /// Default sampling temperature
    pub temperature: f32,
    /// Default completion token limit
    pub max_tokens: u32,
    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ProviderProfile {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1000,
            request_timeout_secs: 120,
        }
    }
}

impl ProviderProfile {
    /// Profile for an endpoint and model
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the bearer token
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Request skeleton carrying this profile's model and sampling defaults
    #[must_use]
    pub fn request(&self) -> ChatRequest {
        ChatRequest::new(self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}
