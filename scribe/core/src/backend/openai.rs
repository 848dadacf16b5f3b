//! OpenAI-Compatible Backend
//!
//! Talks to any provider that implements the OpenAI chat completions API:
//! OpenAI itself, Lambda-hosted models, local servers.
//!
//! # Streaming format
//!
//! With `stream: true` the provider answers with server-sent events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"The"}}]}
//!
//! data: {"choices":[{"delta":{"content":" cat"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Network chunks do not respect line boundaries, so bytes are buffered and
//! only complete lines are parsed.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::traits::{
    ChatMessage, ChatRequest, LlmBackend, LlmResponse, ProviderProfile, StreamingToken,
};
use crate::streaming::DONE_SENTINEL;

/// What one SSE line carried
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    /// A content delta
    Delta(String),
    /// The `[DONE]` marker
    Done,
    /// The provider reported an error inside the stream
    Failed(String),
    /// Comments, keep-alives, role-only deltas
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return SseLine::Done;
    }

    let Ok(payload) = serde_json::from_str::<Value>(data) else {
        debug!(line = data, "Ignoring unparsable SSE payload");
        return SseLine::Skip;
    };

    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return SseLine::Failed(message);
    }

    payload["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|content| !content.is_empty())
        .map_or(SseLine::Skip, |content| SseLine::Delta(content.to_string()))
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

impl<'a> CompletionBody<'a> {
    fn new(request: &'a ChatRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: (request.max_tokens > 0).then_some(request.max_tokens),
            stream,
        }
    }
}

/// Backend for OpenAI-compatible chat completion APIs
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Display name for logs
    name: String,
    /// Endpoint and credentials
    profile: ProviderProfile,
    /// HTTP client
    http_client: reqwest::Client,
}

impl OpenAiBackend {
    /// Create a backend for a provider profile
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built (TLS backend unavailable).
    pub fn new(profile: ProviderProfile) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(profile.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            name: "OpenAI".to_string(),
            profile,
            http_client,
        })
    }

    /// Set the name used in logs
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The provider profile
    #[must_use]
    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.profile.base_url.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.profile.base_url.trim_end_matches('/'))
    }

    fn post(&self, body: &CompletionBody<'_>) -> reqwest::RequestBuilder {
        let builder = self.http_client.post(self.completions_url()).json(body);
        match self.profile.api_key.as_deref() {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> bool {
        let mut builder = self
            .http_client
            .get(self.models_url())
            .timeout(Duration::from_secs(5));
        if let Some(key) = self.profile.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }
        builder
            .send()
            .await
            .is_ok_and(|response| response.status().is_success())
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamingToken>> {
        let (tx, rx) = mpsc::channel(100);

        let response = self.post(&CompletionBody::new(request, true)).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {status}: {body}", self.name);
        }

        let mut stream = response.bytes_stream();
        let backend = self.name.clone();

        tokio::spawn(async move {
            let mut pending: Vec<u8> = Vec::new();
            let mut full_response = String::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(backend = %backend, error = %e, "Provider stream broke");
                        let _ = tx.send(StreamingToken::Error(e.to_string())).await;
                        return;
                    }
                };
                pending.extend_from_slice(&bytes);

                while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);

                    match parse_sse_line(line.trim_end()) {
                        SseLine::Delta(content) => {
                            full_response.push_str(&content);
                            if tx.send(StreamingToken::Token(content)).await.is_err() {
                                // Receiver dropped, stop streaming
                                return;
                            }
                        }
                        SseLine::Done => {
                            let _ = tx
                                .send(StreamingToken::Complete {
                                    message: full_response,
                                })
                                .await;
                            return;
                        }
                        SseLine::Failed(message) => {
                            let _ = tx.send(StreamingToken::Error(message)).await;
                            return;
                        }
                        SseLine::Skip => {}
                    }
                }
            }

            // Connection closed without [DONE]; a final line may lack its newline
            let tail = String::from_utf8_lossy(&pending).into_owned();
            if let SseLine::Delta(content) = parse_sse_line(tail.trim()) {
                full_response.push_str(&content);
                if tx.send(StreamingToken::Token(content)).await.is_err() {
                    return;
                }
            }
            let _ = tx
                .send(StreamingToken::Complete {
                    message: full_response,
                })
                .await;
        });

        Ok(rx)
    }

    async fn send(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse> {
        let start = Instant::now();

        let response = self.post(&CompletionBody::new(request, false)).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {status}: {body}", self.name);
        }

        let data: Value = response.json().await?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let tokens_used = data["usage"]["total_tokens"]
            .as_u64()
            .and_then(|t| u32::try_from(t).ok());

        Ok(LlmResponse {
            content,
            model: data["model"]
                .as_str()
                .map_or_else(|| request.model.clone(), str::to_string),
            tokens_used,
            duration_ms: u64::try_from(start.elapsed().as_millis()).ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> OpenAiBackend {
        let profile = ProviderProfile::new(format!("{}/v1", server.uri()), "test-model")
            .with_api_key("sk-test");
        OpenAiBackend::new(profile).unwrap()
    }

    async fn collect(mut rx: mpsc::Receiver<StreamingToken>) -> Vec<StreamingToken> {
        let mut tokens = Vec::new();
        while let Some(token) = rx.recv().await {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            SseLine::Delta("Hi".into())
        );
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"error":{"message":"overloaded"}}"#),
            SseLine::Failed("overloaded".into())
        );
    }

    #[test]
    fn test_completion_body_omits_zero_max_tokens() {
        let request = ChatRequest::new("m").with_user("Go").with_max_tokens(0);
        let body = serde_json::to_value(CompletionBody::new(&request, true)).unwrap();
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_streaming_parses_deltas() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"The cat \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"sat.\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let request = ChatRequest::new("test-model").with_user("Go");
        let tokens = collect(backend.send_streaming(&request).await.unwrap()).await;

        assert_eq!(
            tokens,
            vec![
                StreamingToken::Token("The cat ".into()),
                StreamingToken::Token("sat.".into()),
                StreamingToken::Complete {
                    message: "The cat sat.".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_http_error_fails_to_open() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let request = ChatRequest::new("test-model").with_user("Go");
        let err = backend.send_streaming(&request).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_send_reads_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "test-model",
                "choices": [{"message": {"role": "assistant", "content": "Done."}}],
                "usage": {"total_tokens": 12}
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let request = ChatRequest::new("test-model").with_user("Go");
        let response = backend.send(&request).await.unwrap();
        assert_eq!(response.content, "Done.");
        assert_eq!(response.tokens_used, Some(12));
    }
}
