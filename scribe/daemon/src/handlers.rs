//! Route Handlers
//!
//! Thin adapters between HTTP and [`scribe_core::WritingService`].
//! Streaming endpoints answer with NDJSON (one [`WireChunk`] per line),
//! `/generate` with server-sent events carrying the same objects, and the
//! rest with a single JSON body.
//!
//! # Sections
//!
//! - Response helpers
//! - Chapters
//! - Scenes
//! - Sentences, parameters, passages
//! - Mode, history, prompt library

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use scribe_core::{
    ChapterSuggestionsRequest, GenerationRequest, ParameterSuggestionRequest, PassageRewrite,
    PassageRewriteRequest, PromptEntry, RawPromptRequest, SectionSummaryRequest, SegmentStream,
    SentenceRewriteRequest, ServiceError, SummaryRewriteRequest, WireChunk,
};

use crate::error::ApiError;
use crate::server::AppState;

/// Content type of streamed endpoints
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Response Helpers
// ============================================================================

/// Stream segments as newline-delimited JSON
///
/// Dropping the response body (client gone) drops the segment stream and
/// with it the provider connection.
fn ndjson(stream: SegmentStream) -> Response {
    let lines = stream.map(|item| Ok::<_, Infallible>(WireChunk::from(item).to_ndjson_line()));
    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Stream segments as server-sent events
fn sse(stream: SegmentStream) -> Response {
    let events = stream.map(|item| {
        Ok::<_, Infallible>(Event::default().data(WireChunk::from(item).to_json()))
    });
    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Liveness probe
pub async fn heartbeat() -> Json<Value> {
    Json(json!({"message": "Hello, World!"}))
}

/// Raw prompt, streamed as SSE
pub async fn generate(
    State(state): State<AppState>,
    body: JsonBody<RawPromptRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    Ok(sse(state.service.generate(&request)))
}

// ============================================================================
// Chapters
// ============================================================================

/// New chapter suggestions
pub async fn chapter_suggestions(
    State(state): State<AppState>,
    body: JsonBody<ChapterSuggestionsRequest>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let suggestions = state.service.chapter_suggestions(&request).await?;
    Ok(Json(json!({ "suggestions": suggestions })))
}

/// Chapter outlines
pub async fn chapter_outlines(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let outlines = state.service.chapter_outlines(&request).await?;
    Ok(Json(json!({ "outlines": outlines })))
}

/// Summary of a run of paragraphs
pub async fn section_summary(
    State(state): State<AppState>,
    body: JsonBody<SectionSummaryRequest>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let summary = state.service.section_summary(&request).await?;
    Ok(Json(json!({ "summary": summary })))
}

/// Paragraphs that continue the chapter
pub async fn continue_chapter(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    Ok(ndjson(state.service.continue_chapter(&request).await?))
}

/// Paragraphs inserted at a point in the chapter
pub async fn insert_paragraphs(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    Ok(ndjson(state.service.insert_paragraphs(&request).await?))
}

/// Paragraph rewrite as a stream of JSON actions
pub async fn rewrite_paragraph(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    Ok(ndjson(state.service.rewrite_paragraph(&request).await?))
}

/// Replacement for one sentence of a running summary
pub async fn summary_sentence(
    State(state): State<AppState>,
    body: JsonBody<SummaryRewriteRequest>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let sentence = state.service.summary_sentence(&request).await?;
    Ok(Json(json!({ "newSummary": sentence })))
}

// ============================================================================
// Scenes
// ============================================================================

/// New scene, streamed when the request asks for it
pub async fn new_scene(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    if request.stream {
        return Ok(ndjson(state.service.new_scene(&request)?));
    }
    let scene = state.service.new_scene_buffered(&request).await?;
    Ok(Json(scene).into_response())
}

/// Scene rewrite as a stream of elements
pub async fn rewrite_scene(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    Ok(ndjson(state.service.rewrite_scene(&request)?))
}

/// Scene continuation as a stream of elements
pub async fn continue_scene(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    Ok(ndjson(state.service.continue_scene(&request)?))
}

/// Scene written out as prose
pub async fn scene_paragraphs(
    State(state): State<AppState>,
    body: JsonBody<GenerationRequest>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    Ok(ndjson(state.service.scene_paragraphs(&request)))
}

// ============================================================================
// Sentences, Parameters, Passages
// ============================================================================

/// Single-sentence rewrite; failures are reported in the status object
pub async fn sentence_rewrite(
    State(state): State<AppState>,
    body: JsonBody<SentenceRewriteRequest>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    Ok(Json(state.service.sentence_rewrite(&request).await))
}

/// Suggestion for one story parameter field
pub async fn parameter_suggestion(
    State(state): State<AppState>,
    body: JsonBody<ParameterSuggestionRequest>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let suggestions = state.service.parameter_suggestion(&request).await?;
    Ok(Json(json!({ "suggestions": suggestions })))
}

/// Passage rewrite with refined prompt and summary
pub async fn passage_rewrite(
    State(state): State<AppState>,
    body: JsonBody<PassageRewriteRequest>,
) -> ApiResult<Json<PassageRewrite>> {
    let Json(request) = body?;
    Ok(Json(state.service.passage_rewrite(&request).await?))
}

// ============================================================================
// Mode, History, Prompt Library
// ============================================================================

/// Flip mature mode
pub async fn toggle_mature(State(state): State<AppState>) -> Json<Value> {
    let flag = state.service.mature_mode().toggle();
    info!(flag, "Mature mode toggled");
    Json(json!({ "flag": flag }))
}

/// Current mature mode
pub async fn mature_state(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "flag": state.service.mature_mode().is_enabled() }))
}

/// Replace the saved chat history
pub async fn save_history(
    State(state): State<AppState>,
    body: JsonBody<Value>,
) -> ApiResult<Json<Value>> {
    let Json(history) = body?;
    state.service
        .history()
        .save(&history)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(json!({"message": "Chat history saved successfully!"})))
}

/// The saved chat history
pub async fn load_history(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let history = state.service
        .history()
        .load()
        .await
        .map_err(ServiceError::from)?;
    history
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No chat history found"))
}

/// Query of `/prompts/system`
#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    /// Library key
    #[serde(rename = "type")]
    pub kind: String,
}

/// One prompt library entry
pub async fn system_prompt(
    State(state): State<AppState>,
    query: Result<Query<PromptQuery>, QueryRejection>,
) -> ApiResult<Json<PromptEntry>> {
    let Query(query) = query?;
    debug!(kind = %query.kind, "Prompt library lookup");
    let entry = state.service
        .prompts()
        .entry(&query.kind)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(entry))
}
