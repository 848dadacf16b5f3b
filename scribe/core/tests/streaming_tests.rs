//! End-to-end streaming tests
//!
//! These tests drive the whole path a request takes inside the core:
//! - OpenAI-compatible SSE from a mock provider
//! - Segmentation and refusal detection in the dispatcher
//! - Wire encoding of the resulting items
//! - Configuration files shaping the dispatch options

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scribe_core::config::load_config_from_path;
use scribe_core::{
    GenerationRequest, MatureMode, OpenAiBackend, ProviderProfile, ProviderRoute,
    ProviderRouter, ScribeConfigFile, SegmentMode, StreamDispatcher, StreamItem, WireChunk,
    WritingService,
};

// =============================================================================
// Helpers
// =============================================================================

fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let event = json!({"choices": [{"delta": {"content": delta}}]});
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

async fn provider(deltas: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(deltas), "text/event-stream"),
        )
        .mount(&server)
        .await;
    server
}

fn route_for(server: &MockServer) -> ProviderRoute {
    let profile = ProviderProfile::new(format!("{}/v1", server.uri()), "test-model");
    let backend = OpenAiBackend::new(profile.clone()).unwrap();
    ProviderRoute::new(Arc::new(backend), profile)
}

fn wire_lines(items: Vec<StreamItem>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| WireChunk::from(item).to_json())
        .collect()
}

// =============================================================================
// Provider to wire
// =============================================================================

#[tokio::test]
async fn test_sentences_from_provider_reach_the_wire() {
    let server = provider(&["The cat ", "sat. The dog", " ran. And"]).await;
    let route = route_for(&server);
    let config = ScribeConfigFile::default();

    let dispatcher = StreamDispatcher::new(
        route.backend(),
        config.streaming.dispatch_options(SegmentMode::Sentence),
    );
    let items: Vec<StreamItem> = dispatcher
        .dispatch(route.request().with_user("Write."))
        .collect()
        .await;

    assert_eq!(
        wire_lines(items),
        vec![
            r#"{"chunk": "The cat sat."}"#,
            r#"{"chunk": "The dog ran."}"#,
            r#"{"chunk": "And"}"#,
            r#"{"chunk": "[DONE]"}"#,
        ]
    );
}

#[tokio::test]
async fn test_json_objects_from_provider_reach_the_wire() {
    let server = provider(&[
        "```json\n[{\"type\":",
        "\"action\",\"description\":\"Rain\"},",
        "{\"type\":\"dialogue\"}]",
    ])
    .await;
    let route = route_for(&server);

    let dispatcher = StreamDispatcher::new(
        route.backend(),
        ScribeConfigFile::default()
            .streaming
            .dispatch_options(SegmentMode::Json),
    );
    let items: Vec<StreamItem> = dispatcher
        .dispatch(route.request().with_user("Scene."))
        .collect()
        .await;

    assert_eq!(
        wire_lines(items),
        vec![
            r#"{"chunk": "{\"type\": \"action\", \"description\": \"Rain\"}"}"#,
            r#"{"chunk": "{\"type\": \"dialogue\"}"}"#,
            r#"{"chunk": "[DONE]"}"#,
        ]
    );
}

#[tokio::test]
async fn test_provider_refusal_is_one_error_line() {
    let server = provider(&["I'm", " sorry, but I can't continue this story."]).await;
    let route = route_for(&server);

    let dispatcher = StreamDispatcher::new(
        route.backend(),
        ScribeConfigFile::default()
            .streaming
            .dispatch_options(SegmentMode::Sentence),
    );
    let items: Vec<StreamItem> = dispatcher
        .dispatch(route.request().with_user("Write."))
        .collect()
        .await;

    assert_eq!(
        wire_lines(items),
        vec![r#"{"error": "An error occurred: I'm sorry phrase detected"}"#]
    );
}

#[tokio::test]
async fn test_provider_rejection_is_one_error_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;
    let route = route_for(&server);

    let items: Vec<StreamItem> = StreamDispatcher::new(
        route.backend(),
        ScribeConfigFile::default()
            .streaming
            .dispatch_options(SegmentMode::Sentence),
    )
    .dispatch(route.request().with_user("Write."))
    .collect()
    .await;

    assert_eq!(items.len(), 1);
    let wire = WireChunk::from(items.into_iter().next().unwrap());
    assert!(wire.is_terminal());
    assert!(wire.to_json().contains("upstream down"));
}

// =============================================================================
// Service and configuration
// =============================================================================

#[tokio::test]
async fn test_config_file_disables_paragraph_escaping() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[streaming]
escape_paragraph_breaks = false
"#
    )
    .unwrap();
    let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
    assert!(!config.streaming.escape_paragraph_breaks);

    let server = provider(&["First.\n\nSecond. "]).await;
    let service = WritingService::new(
        ProviderRouter::new(route_for(&server)),
        &config,
        Arc::new(MatureMode::default()),
    );

    let request = GenerationRequest::new(json!({"current_screenplay": "{}"}), "");
    let items: Vec<StreamItem> = service.scene_paragraphs(&request).collect().await;
    let lines = wire_lines(items);

    assert_eq!(
        lines,
        vec![
            r#"{"chunk": "First."}"#,
            r#"{"chunk": "Second."}"#,
            r#"{"chunk": "[DONE]"}"#,
        ]
    );
}

#[tokio::test]
async fn test_mature_requests_use_mature_provider() {
    let standard = provider(&["Standard. "]).await;
    let mature = provider(&["Mature. "]).await;
    let router = ProviderRouter::new(route_for(&standard)).with_mature(route_for(&mature));
    let mode = Arc::new(MatureMode::default());
    let service = WritingService::new(router, &ScribeConfigFile::default(), Arc::clone(&mode));

    let mut request = GenerationRequest::new(json!({}), "Go.");
    let first: Vec<StreamItem> = service.scene_paragraphs(&request).collect().await;
    assert_eq!(wire_lines(first)[0], r#"{"chunk": "Standard."}"#);

    mode.toggle();
    let second: Vec<StreamItem> = service.scene_paragraphs(&request).collect().await;
    assert_eq!(wire_lines(second)[0], r#"{"chunk": "Mature."}"#);

    request.mature = Some(false);
    let third: Vec<StreamItem> = service.scene_paragraphs(&request).collect().await;
    assert_eq!(wire_lines(third)[0], r#"{"chunk": "Standard."}"#);
}
