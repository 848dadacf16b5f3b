//! Writing Service
//!
//! The operations behind the writing endpoints. Each one validates its
//! payload, assembles a prompt, picks a provider and either returns a
//! segment stream or waits for the whole answer.
//!
//! # Sections
//!
//! - Errors: [`ServiceError`]
//! - Plumbing: provider selection, buffered text and JSON calls
//! - Chapters, scenes, sentences and passages

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::backend::{ProviderRoute, ProviderRouter};
use crate::config::{ScribeConfigFile, StreamingConfig};
use crate::history::{HistoryError, HistoryStore};
use crate::mode::MatureMode;
use crate::prompts::{builders, PromptLibrary, PromptLibraryError, PromptSpec};
use crate::requests::{
    ChapterSuggestionsRequest, GenerationRequest, ParameterSuggestionRequest,
    PassageRewriteRequest, RawPromptRequest, SectionSummaryRequest, SentenceRewriteRequest,
    SummaryRewriteRequest,
};
use crate::streaming::{
    strip_code_fences, StreamDispatcher, StreamItem, INVALID_PROMPT_MESSAGE,
};

/// Token limit for buffered JSON answers, which can be long
pub const JSON_MAX_TOKENS: u32 = 10_000;

/// Default chapters to suggest
pub const DEFAULT_CHAPTER_SUGGESTIONS: i64 = 3;
/// Default intended chapter total
pub const DEFAULT_TOTAL_CHAPTERS: i64 = 10;
/// Default outlines per request
pub const DEFAULT_OUTLINES: i64 = 3;
/// Default paragraphs to write, insert or rewrite
pub const DEFAULT_PARAGRAPHS: i64 = 1;
/// Default screenplay elements per scene
pub const DEFAULT_SCENE_ELEMENTS: i64 = 10;

const INVALID_MODEL_JSON: &str = "Invalid response format from LLM";

/// A stream of segments for one request
pub type SegmentStream = BoxStream<'static, StreamItem>;

// ============================================================================
// Errors
// ============================================================================

/// Errors from the writing service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is malformed
    #[error("{0}")]
    Validation(String),

    /// The model answered, but not in the shape asked for
    #[error("{0}")]
    InvalidModelOutput(String),

    /// The provider call failed
    #[error("An error occurred: {0}")]
    Provider(String),

    /// History storage failed
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Prompt library lookup failed
    #[error(transparent)]
    Prompts(#[from] PromptLibraryError),
}

impl ServiceError {
    /// Whether the caller is at fault
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidModelOutput(_))
    }

    /// Whether the thing asked for does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Prompts(PromptLibraryError::NotFound(_)))
    }
}

fn positive(count: i64, what: &str) -> Result<i64, ServiceError> {
    if count <= 0 {
        return Err(ServiceError::Validation(format!(
            "Number of {what} must be positive"
        )));
    }
    Ok(count)
}

/// Result of a passage rewrite
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageRewrite {
    /// The rewritten passage
    pub updated_passage: String,
    /// The prompt refined to match the instruction
    pub refined_user_prompt: String,
    /// One-sentence summary of the rewritten passage
    pub summary: String,
}

// ============================================================================
// Writing Service
// ============================================================================

/// Writing operations over the configured providers
#[derive(Clone, Debug)]
pub struct WritingService {
    router: ProviderRouter,
    streaming: StreamingConfig,
    prompts: PromptLibrary,
    history: HistoryStore,
    mature: Arc<MatureMode>,
}

impl WritingService {
    /// Service over a router, with storage and segmentation from `config`
    #[must_use]
    pub fn new(router: ProviderRouter, config: &ScribeConfigFile, mature: Arc<MatureMode>) -> Self {
        let storage = &config.storage;
        Self {
            router,
            streaming: config.streaming.clone(),
            prompts: PromptLibrary::new(
                storage.system_prompts_file.clone(),
                storage.chat_parameters_file.clone(),
            ),
            history: HistoryStore::new(storage.history_file.clone()),
            mature,
        }
    }

    /// Service with OpenAI-compatible backends for the configured providers
    ///
    /// # Errors
    ///
    /// Fails if an HTTP client cannot be built.
    pub fn from_config(config: &ScribeConfigFile) -> anyhow::Result<Self> {
        let router = ProviderRouter::from_profiles(
            config.provider.to_profile(),
            config.mature_provider.as_ref().map(|p| p.to_profile()),
        )?;
        let mature = Arc::new(MatureMode::new(config.mature_default));
        Ok(Self::new(router, config, mature))
    }

    /// Runtime mature-mode switch
    #[must_use]
    pub fn mature_mode(&self) -> &Arc<MatureMode> {
        &self.mature
    }

    /// Prompt library
    #[must_use]
    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    /// History store
    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Whether a mature provider is configured
    #[must_use]
    pub fn has_mature_provider(&self) -> bool {
        self.router.has_mature()
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn route(&self, mature: Option<bool>) -> &ProviderRoute {
        self.router.route(self.mature.resolve(mature))
    }

    /// Stream a prompt's answer as segments
    #[must_use]
    pub fn stream(&self, spec: PromptSpec, mature: Option<bool>) -> SegmentStream {
        let route = self.route(mature);
        let options = self.streaming.dispatch_options(spec.mode);
        let request = spec.into_request(route.request());
        StreamDispatcher::new(route.backend(), options).dispatch(request)
    }

    /// Wait for a prompt's whole answer
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for an empty prompt,
    /// [`ServiceError::Provider`] if the call fails.
    pub async fn complete_text(
        &self,
        spec: PromptSpec,
        mature: Option<bool>,
    ) -> Result<String, ServiceError> {
        self.complete(spec, mature, None).await
    }

    /// Wait for a prompt's whole answer and parse it as JSON
    ///
    /// Markdown code fences around the answer are ignored.
    ///
    /// # Errors
    ///
    /// As [`Self::complete_text`], plus [`ServiceError::InvalidModelOutput`]
    /// when the answer is not JSON.
    pub async fn complete_json(
        &self,
        spec: PromptSpec,
        mature: Option<bool>,
    ) -> Result<Value, ServiceError> {
        let text = self.complete(spec, mature, Some(JSON_MAX_TOKENS)).await?;
        parse_model_json(&text)
    }

    async fn complete(
        &self,
        spec: PromptSpec,
        mature: Option<bool>,
        max_tokens: Option<u32>,
    ) -> Result<String, ServiceError> {
        let route = self.route(mature);
        let mut request = spec.into_request(route.request());
        if request.is_blank() {
            return Err(ServiceError::Validation(INVALID_PROMPT_MESSAGE.to_string()));
        }
        if let Some(limit) = max_tokens {
            let current = request.max_tokens;
            request = request.with_max_tokens(limit.max(current));
        }

        let backend = route.backend();
        match backend.send(&request).await {
            Ok(response) => {
                info!(
                    backend = backend.name(),
                    model = %response.model,
                    tokens = ?response.tokens_used,
                    duration_ms = ?response.duration_ms,
                    "Completion received"
                );
                Ok(response.content)
            }
            Err(e) => {
                error!(backend = backend.name(), error = %e, "Completion failed");
                Err(ServiceError::Provider(e.to_string()))
            }
        }
    }

    /// Stream a caller-supplied prompt as sentences
    #[must_use]
    pub fn generate(&self, request: &RawPromptRequest) -> SegmentStream {
        self.stream(builders::raw(request), request.mature)
    }

    // ------------------------------------------------------------------------
    // Chapters
    // ------------------------------------------------------------------------

    /// Suggested titles, synopses and acts for the next chapters
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a non-positive count or a total too
    /// small to hold the existing and new chapters.
    pub async fn chapter_suggestions(
        &self,
        request: &ChapterSuggestionsRequest,
    ) -> Result<Value, ServiceError> {
        let wanted = request
            .number_of_chapters
            .unwrap_or(DEFAULT_CHAPTER_SUGGESTIONS);
        let total = request.total_chapters.unwrap_or(DEFAULT_TOTAL_CHAPTERS);
        info!(wanted, total, "Generating chapter suggestions");

        positive(wanted, "chapters to generate")?;
        let existing = i64::try_from(request.chapters.len()).unwrap_or(i64::MAX);
        if total < existing.saturating_add(wanted) {
            return Err(ServiceError::Validation(
                "Total chapters cannot be less than existing chapters plus new chapters"
                    .to_string(),
            ));
        }

        let spec = builders::chapter_suggestions(request, wanted, total);
        let suggestions = self.complete_json(spec, request.mature).await?;
        if let Some(list) = suggestions.as_array() {
            if i64::try_from(list.len()).ok() != Some(wanted) {
                warn!(
                    returned = list.len(),
                    wanted, "Model returned a different number of chapters"
                );
            }
        }
        Ok(suggestions)
    }

    /// Exactly `count` one-line outlines for the next paragraphs
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidModelOutput`] unless the model returns a list
    /// of exactly `count` objects that each carry an `outline` key.
    pub async fn chapter_outlines(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<Value>, ServiceError> {
        let count = positive(request.count_or(DEFAULT_OUTLINES), "outlines to generate")?;
        info!(count, "Generating chapter outlines");

        let answer = self
            .complete_json(builders::chapter_outlines(request, count), request.mature)
            .await?;
        let outlines = match answer {
            Value::Array(items) if i64::try_from(items.len()).ok() == Some(count) => items,
            Value::Array(items) => {
                return Err(ServiceError::InvalidModelOutput(format!(
                    "Expected {count} outlines, but received {}",
                    items.len()
                )))
            }
            _ => {
                return Err(ServiceError::InvalidModelOutput(format!(
                    "Expected {count} outlines, but received non-list data"
                )))
            }
        };
        if !outlines.iter().all(|o| o.get("outline").is_some()) {
            return Err(ServiceError::InvalidModelOutput(
                "Invalid outline format in LLM response".to_string(),
            ));
        }
        Ok(outlines)
    }

    /// Structured summary of a section's paragraphs
    ///
    /// # Errors
    ///
    /// Provider failures or a non-JSON answer.
    pub async fn section_summary(
        &self,
        request: &SectionSummaryRequest,
    ) -> Result<Value, ServiceError> {
        info!("Summarizing section");
        self.complete_json(builders::section_summary(request), request.mature)
            .await
    }

    /// Stream paragraphs that continue the chapter
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a non-positive paragraph count.
    pub async fn continue_chapter(
        &self,
        request: &GenerationRequest,
    ) -> Result<SegmentStream, ServiceError> {
        let count = positive(request.count_or(DEFAULT_PARAGRAPHS), "paragraphs")?;
        let system = self.prompts.writing_assistant().await;
        info!(count, "Continuing chapter");
        Ok(self.stream(
            builders::continue_chapter(&system, request, count),
            request.mature,
        ))
    }

    /// Stream paragraphs to insert between two existing ones
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a non-positive paragraph count.
    pub async fn insert_paragraphs(
        &self,
        request: &GenerationRequest,
    ) -> Result<SegmentStream, ServiceError> {
        let count = positive(request.count_or(DEFAULT_PARAGRAPHS), "paragraphs")?;
        let system = self.prompts.writing_assistant().await;
        info!(count, "Inserting paragraphs");
        Ok(self.stream(
            builders::insert_paragraphs(&system, request, count),
            request.mature,
        ))
    }

    /// Stream a sentence-level edit list for a paragraph
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] when there is no paragraph to rewrite or
    /// the paragraph count is not positive.
    pub async fn rewrite_paragraph(
        &self,
        request: &GenerationRequest,
    ) -> Result<SegmentStream, ServiceError> {
        let paragraph = request
            .paragraph
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ServiceError::Validation("No paragraph to rewrite".to_string()))?;
        let count = positive(request.count_or(DEFAULT_PARAGRAPHS), "paragraphs")?;
        let system = self.prompts.writing_assistant().await;
        info!(count, "Rewriting paragraph");
        Ok(self.stream(
            builders::rewrite_paragraph(&system, request, paragraph, count),
            request.mature,
        ))
    }

    /// Replacement for one sentence of a running summary
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub async fn summary_sentence(
        &self,
        request: &SummaryRewriteRequest,
    ) -> Result<String, ServiceError> {
        let text = self
            .complete_text(builders::summary_sentence(request), request.mature)
            .await?;
        Ok(flatten_paragraphs(&text))
    }

    // ------------------------------------------------------------------------
    // Scenes
    // ------------------------------------------------------------------------

    fn scene_elements(request: &GenerationRequest) -> Result<i64, ServiceError> {
        positive(request.count_or(DEFAULT_SCENE_ELEMENTS), "elements")
    }

    /// Stream a new screenplay scene as JSON objects
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a non-positive element count.
    pub fn new_scene(&self, request: &GenerationRequest) -> Result<SegmentStream, ServiceError> {
        let count = Self::scene_elements(request)?;
        info!(count, "Generating new scene");
        Ok(self.stream(builders::new_scene(request, count), request.mature))
    }

    /// A new screenplay scene as one JSON value
    ///
    /// # Errors
    ///
    /// Validation and provider failures, or a non-JSON answer.
    pub async fn new_scene_buffered(
        &self,
        request: &GenerationRequest,
    ) -> Result<Value, ServiceError> {
        let count = Self::scene_elements(request)?;
        info!(count, "Generating new scene (buffered)");
        self.complete_json(builders::new_scene(request, count), request.mature)
            .await
    }

    /// Stream a rewritten screenplay scene
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a non-positive element count.
    pub fn rewrite_scene(
        &self,
        request: &GenerationRequest,
    ) -> Result<SegmentStream, ServiceError> {
        let count = Self::scene_elements(request)?;
        info!(count, "Rewriting scene");
        Ok(self.stream(builders::rewrite_scene(request, count), request.mature))
    }

    /// Stream further elements for a screenplay scene
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for a non-positive element count.
    pub fn continue_scene(
        &self,
        request: &GenerationRequest,
    ) -> Result<SegmentStream, ServiceError> {
        let count = Self::scene_elements(request)?;
        info!(count, "Continuing scene");
        Ok(self.stream(builders::continue_scene(request, count), request.mature))
    }

    /// Stream prose written from a screenplay scene
    #[must_use]
    pub fn scene_paragraphs(&self, request: &GenerationRequest) -> SegmentStream {
        info!("Writing scene paragraphs");
        self.stream(builders::scene_paragraphs(request), request.mature)
    }

    // ------------------------------------------------------------------------
    // Sentences, Parameters, Passages
    // ------------------------------------------------------------------------

    /// Rewrite one sentence, answering with a status object
    ///
    /// Never fails: provider and format problems become
    /// `{"status": "error", "message": ...}`.
    pub async fn sentence_rewrite(&self, request: &SentenceRewriteRequest) -> Value {
        let text = match self
            .complete_text(builders::sentence_rewrite(request), request.mature)
            .await
        {
            Ok(text) => text,
            Err(e) => return json!({"status": "error", "message": e.to_string()}),
        };

        let Ok(answer) = serde_json::from_str::<Value>(&strip_code_fences(&text)) else {
            warn!(answer = %text, "Sentence rewrite answer is not JSON");
            return json!({"status": "error", "message": "Invalid JSON response from AI"});
        };

        if let Some(revised) = answer.get("revised_sentence") {
            json!({"status": "complete", "revised_sentence": revised})
        } else if answer.get("revision_needed") == Some(&Value::Bool(false)) {
            json!({"status": "ok", "revised_sentence": null})
        } else {
            json!({"status": "error", "message": "Unexpected response format"})
        }
    }

    /// Suggestion for one story parameter
    ///
    /// The answer is parsed as JSON when it is JSON and passed through as a
    /// string otherwise.
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub async fn parameter_suggestion(
        &self,
        request: &ParameterSuggestionRequest,
    ) -> Result<Value, ServiceError> {
        info!(field = %request.field_type, "Suggesting parameter");
        let text = self
            .complete_text(builders::parameter_suggestion(request), request.mature)
            .await?;
        Ok(serde_json::from_str(&strip_code_fences(&text)).unwrap_or(Value::String(text)))
    }

    /// One-sentence summary of a paragraph
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub async fn paragraph_summary(
        &self,
        paragraph: &str,
        previous_summary: Option<&str>,
        mature: Option<bool>,
    ) -> Result<String, ServiceError> {
        let text = self
            .complete_text(builders::paragraph_summary(paragraph, previous_summary), mature)
            .await?;
        Ok(flatten_paragraphs(&text))
    }

    /// Rewrite a passage, refine its prompt and summarize the result
    ///
    /// # Errors
    ///
    /// Provider failures in any of the three calls.
    pub async fn passage_rewrite(
        &self,
        request: &PassageRewriteRequest,
    ) -> Result<PassageRewrite, ServiceError> {
        info!("Rewriting passage");
        let updated_passage = self
            .complete_text(builders::passage_rewrite(request), request.mature)
            .await?;
        let refined_user_prompt = self
            .complete_text(builders::prompt_refinement(request), request.mature)
            .await?;
        let summary = self
            .paragraph_summary(
                &updated_passage,
                request.previous_summary.as_deref(),
                request.mature,
            )
            .await?;

        Ok(PassageRewrite {
            updated_passage,
            refined_user_prompt,
            summary,
        })
    }
}

/// Parse a model answer as JSON, ignoring markdown fences
fn parse_model_json(text: &str) -> Result<Value, ServiceError> {
    serde_json::from_str(&strip_code_fences(text)).map_err(|e| {
        error!(error = %e, "Failed to parse model answer as JSON");
        ServiceError::InvalidModelOutput(INVALID_MODEL_JSON.to_string())
    })
}

fn flatten_paragraphs(text: &str) -> String {
    text.replace("\n\n", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ProviderProfile, ScriptedBackend};
    use crate::streaming::Segment;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    fn service(backend: &ScriptedBackend) -> WritingService {
        let route = ProviderRoute::new(Arc::new(backend.clone()), ProviderProfile::default());
        let mut config = ScribeConfigFile::default();
        config.storage.system_prompts_file = "/nonexistent/system_prompts.json".into();
        WritingService::new(ProviderRouter::new(route), &config, Arc::new(MatureMode::default()))
    }

    fn reply(text: &str) -> ScriptedBackend {
        ScriptedBackend::new(Vec::<String>::new()).with_reply(text)
    }

    #[tokio::test]
    async fn test_chapter_suggestion_validation() {
        let backend = reply("[]");
        let service = service(&backend);

        let zero = ChapterSuggestionsRequest {
            number_of_chapters: Some(0),
            ..Default::default()
        };
        let err = service.chapter_suggestions(&zero).await.unwrap_err();
        assert_eq!(err.to_string(), "Number of chapters to generate must be positive");
        assert!(err.is_client_error());

        let crowded = ChapterSuggestionsRequest {
            chapters: vec![json!({}); 9],
            number_of_chapters: Some(2),
            total_chapters: Some(10),
            ..Default::default()
        };
        assert!(matches!(
            service.chapter_suggestions(&crowded).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_chapter_suggestions_strip_fences() {
        let backend = reply("```json\n[{\"title\": \"One\", \"synopsis\": \"s\", \"act\": 1}]\n```");
        let suggestions = service(&backend)
            .chapter_suggestions(&ChapterSuggestionsRequest::default())
            .await
            .unwrap();
        assert_eq!(suggestions[0]["title"], json!("One"));
        assert_eq!(backend.requests()[0].max_tokens, JSON_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_outlines_must_match_count() {
        let request = GenerationRequest::new(json!({}), "Go on.").with_count(2);

        let good = reply(r#"[{"outline": "a"}, {"outline": "b"}]"#);
        assert_eq!(service(&good).chapter_outlines(&request).await.unwrap().len(), 2);

        let short = reply(r#"[{"outline": "a"}]"#);
        let err = service(&short).chapter_outlines(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Expected 2 outlines, but received 1");

        let wrong_shape = reply(r#"[{"outline": "a"}, {"title": "b"}]"#);
        let err = service(&wrong_shape).chapter_outlines(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid outline format in LLM response");

        let prose = reply("Here are some outlines.");
        let err = service(&prose).chapter_outlines(&request).await.unwrap_err();
        assert_eq!(err.to_string(), INVALID_MODEL_JSON);
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_continue_chapter_streams_sentences() {
        let backend = ScriptedBackend::new(["She ran. ", "He followed."]);
        let request = GenerationRequest::new(json!({"previous_paragraph": "Rain."}), "Chase.");
        let items: Vec<StreamItem> = service(&backend)
            .continue_chapter(&request)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items[0], StreamItem::Segment(Segment::sentence("She ran.")));
        assert_eq!(items.len(), 3);

        let sent = &backend.requests()[0];
        assert_eq!(sent.system(), Some(crate::prompts::templates::WRITING_ASSISTANT));
        assert!(sent.prompt().unwrap_or_default().contains("`Rain.`"));
    }

    #[tokio::test]
    async fn test_rewrite_requires_paragraph() {
        let backend = ScriptedBackend::new(["x"]);
        let request = GenerationRequest::new(json!({}), "Shorter.");
        let Err(err) = service(&backend).rewrite_paragraph(&request).await else {
            panic!("rewrite without a paragraph should fail");
        };
        assert_eq!(err.to_string(), "No paragraph to rewrite");
    }

    #[tokio::test]
    async fn test_scene_counts_are_validated() {
        let backend = ScriptedBackend::new(["{}"]);
        let request = GenerationRequest::new(json!({}), "").with_count(0);
        assert!(service(&backend).new_scene(&request).is_err());
        assert!(service(&backend).continue_scene(&request).is_err());
    }

    #[tokio::test]
    async fn test_sentence_rewrite_statuses() {
        let request = SentenceRewriteRequest::default();

        let revised = reply(r#"{"revised_sentence": "Better."}"#);
        assert_eq!(
            service(&revised).sentence_rewrite(&request).await,
            json!({"status": "complete", "revised_sentence": "Better."})
        );

        let unchanged = reply(r#"{"revision_needed": false}"#);
        assert_eq!(
            service(&unchanged).sentence_rewrite(&request).await,
            json!({"status": "ok", "revised_sentence": null})
        );

        let odd = reply(r#"{"something": 1}"#);
        assert_eq!(
            service(&odd).sentence_rewrite(&request).await,
            json!({"status": "error", "message": "Unexpected response format"})
        );

        let prose = reply("No.");
        assert_eq!(
            service(&prose).sentence_rewrite(&request).await,
            json!({"status": "error", "message": "Invalid JSON response from AI"})
        );

        let down = ScriptedBackend::failing_to_connect("timeout");
        assert_eq!(
            service(&down).sentence_rewrite(&request).await,
            json!({"status": "error", "message": "An error occurred: timeout"})
        );
    }

    #[tokio::test]
    async fn test_passage_rewrite_makes_three_calls() {
        let backend = reply("Line one.\n\nLine two.");
        let request = PassageRewriteRequest {
            passage: "Old.".into(),
            instruction: "New.".into(),
            user_prompt: "Write.".into(),
            previous_summary: Some("Before.".into()),
            mature: None,
        };
        let result = service(&backend).passage_rewrite(&request).await.unwrap();

        assert_eq!(result.updated_passage, "Line one.\n\nLine two.");
        assert_eq!(result.summary, "Line one. Line two.");
        assert_eq!(backend.requests().len(), 3);
        assert_eq!(
            serde_json::to_value(&result).unwrap()["refinedUserPrompt"],
            json!("Line one.\n\nLine two.")
        );
    }

    #[tokio::test]
    async fn test_parameter_suggestion_passes_prose_through() {
        let json_reply = reply(r#"{"text": "Ashfall"}"#);
        let request = ParameterSuggestionRequest {
            field_type: "Title".into(),
            ..Default::default()
        };
        assert_eq!(
            service(&json_reply).parameter_suggestion(&request).await.unwrap(),
            json!({"text": "Ashfall"})
        );

        let prose = reply("Ashfall");
        assert_eq!(
            service(&prose).parameter_suggestion(&request).await.unwrap(),
            json!("Ashfall")
        );
    }

    #[tokio::test]
    async fn test_blank_buffered_prompt_is_rejected() {
        let backend = reply("unused");
        let err = service(&backend)
            .complete_text(PromptSpec::sentence("sys", "  "), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), INVALID_PROMPT_MESSAGE);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_json_completion_raises_token_limit() {
        let backend = reply("{\"ok\": true}");
        let service = service(&backend);

        let value = service
            .complete_json(PromptSpec::json("sys", "Give me JSON"), None)
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));

        service
            .complete_text(PromptSpec::sentence("sys", "Give me prose"), None)
            .await
            .unwrap();

        let sent = backend.requests();
        assert_eq!(sent[0].max_tokens, JSON_MAX_TOKENS);
        assert_eq!(sent[1].max_tokens, ProviderProfile::default().max_tokens);
    }

    #[tokio::test]
    async fn test_provider_failure_is_server_error() {
        let backend = ScriptedBackend::failing_to_connect("refused");
        let err = service(&backend)
            .section_summary(&SectionSummaryRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Provider(_)));
        assert!(!err.is_client_error());
    }
}
