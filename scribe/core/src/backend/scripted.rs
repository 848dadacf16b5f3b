//! Scripted Backend
//!
//! Replays a fixed sequence of deltas instead of calling a provider. Used by
//! tests across the workspace and handy for running the daemon offline.
//!
//! # Usage
//!
//! ```ignore
//! use scribe_core::backend::ScriptedBackend;
//!
//! let backend = ScriptedBackend::new(["The cat sat. ", "The dog ran."]);
//! // ... dispatch against it ...
//! assert_eq!(backend.requests().len(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{ChatRequest, LlmBackend, LlmResponse, StreamingToken};

/// How a scripted stream ends
#[derive(Clone, Debug, PartialEq, Eq)]
enum Ending {
    Complete,
    Error(String),
}

/// Backend that plays back canned output
#[derive(Clone, Debug)]
pub struct ScriptedBackend {
    deltas: Vec<String>,
    ending: Ending,
    connect_error: Option<String>,
    reply: Option<String>,
    /// Requests received, oldest first
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    /// Deltas accepted by the receiver so far
    delivered: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    /// Stream `deltas`, then complete
    pub fn new<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            ending: Ending::Complete,
            connect_error: None,
            reply: None,
            requests: Arc::new(Mutex::new(Vec::new())),
            delivered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Refuse to open any stream
    pub fn failing_to_connect(message: impl Into<String>) -> Self {
        let mut backend = Self::new(Vec::<String>::new());
        backend.connect_error = Some(message.into());
        backend
    }

    /// Stream `deltas`, then fail instead of completing
    #[must_use]
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.ending = Ending::Error(message.into());
        self
    }

    /// Answer non-streaming calls with `reply` instead of the joined deltas
    #[must_use]
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Deltas the consumer has accepted so far
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    fn record(&self, request: &ChatRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> bool {
        self.connect_error.is_none()
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamingToken>> {
        self.record(request);
        if let Some(message) = &self.connect_error {
            anyhow::bail!("{message}");
        }

        // Capacity 1 keeps the producer in lock-step with the consumer
        let (tx, rx) = mpsc::channel(1);
        let deltas = self.deltas.clone();
        let ending = self.ending.clone();
        let delivered = Arc::clone(&self.delivered);

        tokio::spawn(async move {
            let mut message = String::new();
            for delta in deltas {
                message.push_str(&delta);
                if tx.send(StreamingToken::Token(delta)).await.is_err() {
                    return;
                }
                delivered.fetch_add(1, Ordering::SeqCst);
            }
            let last = match ending {
                Ending::Complete => StreamingToken::Complete { message },
                Ending::Error(error) => StreamingToken::Error(error),
            };
            let _ = tx.send(last).await;
        });

        Ok(rx)
    }

    async fn send(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse> {
        self.record(request);
        if let Some(message) = &self.connect_error {
            anyhow::bail!("{message}");
        }
        if let Ending::Error(error) = &self.ending {
            anyhow::bail!("{error}");
        }

        Ok(LlmResponse {
            content: self.reply.clone().unwrap_or_else(|| self.deltas.concat()),
            model: request.model.clone(),
            tokens_used: None,
            duration_ms: Some(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script() {
        let backend = ScriptedBackend::new(["a", "b"]);
        let request = ChatRequest::new("m").with_user("go");
        let mut rx = backend.send_streaming(&request).await.unwrap();

        assert_eq!(rx.recv().await, Some(StreamingToken::Token("a".into())));
        assert_eq!(rx.recv().await, Some(StreamingToken::Token("b".into())));
        assert_eq!(
            rx.recv().await,
            Some(StreamingToken::Complete {
                message: "ab".into()
            })
        );
        assert_eq!(rx.recv().await, None);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_send_uses_reply() {
        let backend = ScriptedBackend::new(["x"]).with_reply("{\"ok\": true}");
        let request = ChatRequest::new("m").with_user("go");
        assert_eq!(backend.send(&request).await.unwrap().content, "{\"ok\": true}");

        let failing = ScriptedBackend::failing_to_connect("refused");
        assert!(failing.send(&request).await.is_err());
        assert!(!failing.health_check().await);
    }
}
