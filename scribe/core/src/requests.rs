//! Request Payloads
//!
//! Inbound shapes for the writing endpoints. Field names follow the JSON
//! the web client sends; the camelCase spellings it also uses are accepted
//! as aliases.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render a context value for a prompt: strings verbatim, other JSON compact,
/// absent or null as the empty string
#[must_use]
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

// ============================================================================
// Story Context
// ============================================================================

/// Free-form context the client attaches to a request
///
/// Usually an object with keys such as `synopsis`, `parameters` or
/// `previous_paragraph`, but any JSON value is accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryContext(Value);

impl StoryContext {
    /// Wrap a JSON value
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// A key rendered for a prompt (empty when missing)
    #[must_use]
    pub fn field(&self, key: &str) -> String {
        render_value(self.0.get(key))
    }

    /// The whole context rendered for a prompt
    #[must_use]
    pub fn render(&self) -> String {
        render_value(Some(&self.0))
    }

    /// The whole context as indented JSON
    #[must_use]
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.render())
    }

    /// The raw value
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for StoryContext {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ============================================================================
// Generation Requests
// ============================================================================

/// Common shape of the chapter and scene endpoints
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Story context
    #[serde(default)]
    pub context: StoryContext,
    /// What the author wants
    #[serde(default)]
    pub instruction: Option<String>,
    /// Paragraphs, outlines or scene elements requested
    #[serde(default, alias = "numParagraphs", alias = "num_outlines")]
    pub count: Option<i64>,
    /// Stream instead of buffering (scene endpoints)
    #[serde(default)]
    pub stream: bool,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
    /// Text to rewrite (paragraph rewrite)
    #[serde(default)]
    pub paragraph: Option<String>,
}

impl GenerationRequest {
    /// Request with the given context and instruction
    pub fn new(context: impl Into<StoryContext>, instruction: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            instruction: Some(instruction.into()),
            ..Default::default()
        }
    }

    /// Set the count
    #[must_use]
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    /// Instruction text (empty when absent)
    #[must_use]
    pub fn instruction(&self) -> &str {
        self.instruction.as_deref().unwrap_or_default()
    }

    /// Count, or `default` when the client sent none
    #[must_use]
    pub fn count_or(&self, default: i64) -> i64 {
        self.count.unwrap_or(default)
    }
}

/// New chapter title/synopsis/act suggestions
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChapterSuggestionsRequest {
    /// Chapters written so far
    #[serde(default)]
    pub chapters: Vec<Value>,
    /// Story parameters
    #[serde(default)]
    pub parameters: Value,
    /// Chapters to suggest (default 3)
    #[serde(default)]
    pub number_of_chapters: Option<i64>,
    /// Intended chapter total (default 10)
    #[serde(default)]
    pub total_chapters: Option<i64>,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
}

/// Structured summary of a run of paragraphs
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SectionSummaryRequest {
    /// Story context (`parameters`, `synopsis`)
    #[serde(default)]
    pub context: StoryContext,
    /// Paragraphs to summarize
    #[serde(default)]
    pub paragraphs: Value,
    /// Summary of the section so far
    #[serde(default)]
    pub previous_summary: Value,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
}

/// Replacement for one sentence of a running summary
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SummaryRewriteRequest {
    /// Rewritten paragraph
    #[serde(default)]
    pub paragraph: String,
    /// The running summary
    #[serde(default, alias = "fullSummary")]
    pub full_summary: String,
    /// Sentence of the summary being replaced
    #[serde(default, alias = "summarySentence")]
    pub summary_sentence: String,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
}

/// Targeted rewrite of one sentence
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SentenceRewriteRequest {
    /// The sentence
    #[serde(default)]
    pub sentence: String,
    /// What to change
    #[serde(default)]
    pub instruction: String,
    /// Paragraph the sentence belongs to
    #[serde(default)]
    pub paragraph: String,
    /// Story parameters
    #[serde(default)]
    pub parameters: Value,
    /// Synopsis of the chapter
    #[serde(default)]
    pub chapter_synopsis: Value,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
}

/// Suggestion for one story parameter field
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParameterSuggestionRequest {
    /// Field being filled (`Title`, `Genre`, `character`, ...)
    #[serde(default, alias = "fieldType")]
    pub field_type: String,
    /// What the field holds now
    #[serde(default, alias = "currentValue")]
    pub current_value: Value,
    /// Surrounding story context
    #[serde(default)]
    pub context: Value,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
}

/// Rewrite of a passage together with the prompt that produced it
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PassageRewriteRequest {
    /// The passage
    #[serde(default)]
    pub passage: String,
    /// What to change
    #[serde(default)]
    pub instruction: String,
    /// Prompt the passage was generated from
    #[serde(default, alias = "userPrompt")]
    pub user_prompt: String,
    /// Summary preceding the passage
    #[serde(default, alias = "previousSummary")]
    pub previous_summary: Option<String>,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
}

/// Free-form prompt with a caller-supplied system prompt
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawPromptRequest {
    /// User prompt
    #[serde(default)]
    pub prompt: Option<String>,
    /// System prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Route to the mature provider
    #[serde(default, alias = "isNsfw")]
    pub mature: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(None), "");
        assert_eq!(render_value(Some(&Value::Null)), "");
        assert_eq!(render_value(Some(&json!("plain"))), "plain");
        assert_eq!(render_value(Some(&json!({"a": [1, 2]}))), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_story_context_fields() {
        let context = StoryContext::new(json!({
            "synopsis": "A heist.",
            "parameters": {"genre": "noir"}
        }));
        assert_eq!(context.field("synopsis"), "A heist.");
        assert_eq!(context.field("parameters"), r#"{"genre":"noir"}"#);
        assert_eq!(context.field("missing"), "");

        let text = StoryContext::new(json!("just text"));
        assert_eq!(text.field("synopsis"), "");
        assert_eq!(text.render(), "just text");
    }

    #[test]
    fn test_client_aliases() {
        let request: GenerationRequest = serde_json::from_value(json!({
            "context": {},
            "instruction": "More rain.",
            "numParagraphs": 2,
            "isNsfw": true
        }))
        .unwrap();
        assert_eq!(request.count, Some(2));
        assert_eq!(request.mature, Some(true));
        assert_eq!(request.instruction(), "More rain.");

        let passage: PassageRewriteRequest = serde_json::from_value(json!({
            "passage": "p",
            "instruction": "i",
            "userPrompt": "u",
            "previousSummary": "s"
        }))
        .unwrap();
        assert_eq!(passage.user_prompt, "u");
        assert_eq!(passage.previous_summary.as_deref(), Some("s"));
    }

    #[test]
    fn test_missing_fields_default() {
        let request: GenerationRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.instruction(), "");
        assert_eq!(request.count_or(3), 3);
        assert!(!request.stream);
        assert_eq!(request.context.render(), "");
    }
}
