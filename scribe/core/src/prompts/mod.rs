//! Prompt Assembly
//!
//! Turns endpoint payloads into the system and user prompts sent to the
//! provider, and records which segmentation mode the output calls for.
//!
//! # Sections
//!
//! - [`PromptSpec`]: one assembled prompt
//! - [`builders`]: one function per writing endpoint
//! - [`templates`]: fixed system prompts
//! - [`PromptLibrary`]: editable prompts loaded from disk

pub mod builders;
mod library;
pub mod templates;

pub use library::{PromptEntry, PromptLibrary, PromptLibraryError, WRITING_ASSISTANT_KEY};

use crate::backend::ChatRequest;
use crate::streaming::SegmentMode;

// ============================================================================
// Prompt Spec
// ============================================================================

/// An assembled prompt, ready to be sent
#[derive(Clone, Debug, PartialEq)]
pub struct PromptSpec {
    /// System prompt
    pub system: String,
    /// User prompt
    pub user: String,
    /// How streamed output is segmented
    pub mode: SegmentMode,
    /// Free-form parameter block appended to the system prompt
    pub parameters: Option<String>,
    /// Few-shot (user, assistant) pairs placed before the user prompt
    pub examples: Vec<(String, String)>,
}

impl PromptSpec {
    /// Prompt whose output is prose
    pub fn sentence(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(system, user, SegmentMode::Sentence)
    }

    /// Prompt whose output is JSON
    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(system, user, SegmentMode::Json)
    }

    fn new(system: impl Into<String>, user: impl Into<String>, mode: SegmentMode) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            mode,
            parameters: None,
            examples: Vec::new(),
        }
    }

    /// Append a parameter block to the system prompt
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    /// Add a few-shot example
    #[must_use]
    pub fn with_example(mut self, user: impl Into<String>, assistant: impl Into<String>) -> Self {
        self.examples.push((user.into(), assistant.into()));
        self
    }

    /// System prompt with the parameter block, if any, after a blank line
    #[must_use]
    pub fn system_prompt(&self) -> String {
        match self.parameters.as_deref() {
            Some(parameters) if !parameters.is_empty() => {
                format!("{}\n\n{parameters}", self.system)
            }
            _ => self.system.clone(),
        }
    }

    /// Fill a provider request skeleton with this prompt
    #[must_use]
    pub fn into_request(self, base: ChatRequest) -> ChatRequest {
        let mut request = base.with_system(self.system_prompt());
        for (user, assistant) in self.examples {
            request = request.with_example(user, assistant);
        }
        request.with_user(self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatRole;

    #[test]
    fn test_parameters_follow_blank_line() {
        let spec = PromptSpec::sentence("Be brief.", "Go.").with_parameters("genre: noir");
        assert_eq!(spec.system_prompt(), "Be brief.\n\ngenre: noir");

        let empty = PromptSpec::sentence("Be brief.", "Go.").with_parameters("");
        assert_eq!(empty.system_prompt(), "Be brief.");
    }

    #[test]
    fn test_into_request_orders_messages() {
        let request = PromptSpec::json("sys", "now")
            .with_example("q1", "a1")
            .into_request(ChatRequest::new("m"));

        let roles: Vec<ChatRole> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(request.system(), Some("sys"));
        assert_eq!(request.prompt(), Some("now"));
    }
}
