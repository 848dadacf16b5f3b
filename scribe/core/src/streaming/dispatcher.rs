//! Stream Dispatcher
//!
//! Drives one provider stream through a [`SegmentPipeline`] and hands the
//! result out as a pull-based [`futures::Stream`] of [`StreamItem`]s.
//!
//! # States
//!
//! ```text
//! Connecting ──ok──▶ Streaming ──provider done──▶ Complete (flush, Done)
//!      │                 │
//!      └──err──▶ Aborted ◀──provider error / refusal
//! ```
//!
//! Nothing happens until the consumer polls. Each segment is handed out
//! before the next delta is read, so output order is exactly source order.
//! Dropping the stream drops the provider receiver, which stops the
//! backend's reader task. There are no retries here.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::pipeline::SegmentPipeline;
use super::refusal::{RefusalDetector, DEFAULT_REFUSAL_PREAMBLE};
use super::segmenter::SegmenterOptions;
use super::types::{Segment, SegmentMode, StreamError, StreamItem};
use crate::backend::{ChatRequest, LlmBackend, StreamingToken};

/// Message sent when a request has nothing to generate from
pub const INVALID_PROMPT_MESSAGE: &str = "Please provide a valid prompt.";

// ============================================================================
// Options
// ============================================================================

/// Per-stream dispatch settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Segmentation mode
    pub mode: SegmentMode,
    /// Segmenter tuning
    pub segmenter: SegmenterOptions,
    /// Refusal preambles checked against the start of the stream
    pub refusal_preambles: Vec<String>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            mode: SegmentMode::Sentence,
            segmenter: SegmenterOptions::default(),
            refusal_preambles: vec![DEFAULT_REFUSAL_PREAMBLE.to_string()],
        }
    }
}

impl DispatchOptions {
    /// Defaults for a mode
    #[must_use]
    pub fn new(mode: SegmentMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Replace the segmenter options
    #[must_use]
    pub fn with_segmenter_options(mut self, segmenter: SegmenterOptions) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Replace the refusal preambles
    #[must_use]
    pub fn with_refusal_preambles(mut self, preambles: Vec<String>) -> Self {
        self.refusal_preambles = preambles;
        self
    }

    fn pipeline(&self) -> SegmentPipeline {
        SegmentPipeline::for_mode(
            self.mode,
            self.segmenter,
            RefusalDetector::new(self.refusal_preambles.clone()),
        )
    }
}

// ============================================================================
// State machine
// ============================================================================

enum DispatchPhase {
    Connecting {
        backend: Arc<dyn LlmBackend>,
        request: ChatRequest,
    },
    Streaming {
        tokens: mpsc::Receiver<StreamingToken>,
    },
    Finished,
}

struct Dispatch {
    phase: DispatchPhase,
    pipeline: SegmentPipeline,
    /// Items produced but not yet handed out
    ready: VecDeque<StreamItem>,
    started: Instant,
}

impl Dispatch {
    fn emit_segments(&mut self, segments: Vec<Segment>) {
        self.ready.extend(segments.into_iter().map(StreamItem::Segment));
    }

    fn abort(&mut self, error: StreamError) {
        self.phase = DispatchPhase::Finished;
        self.ready.push_back(StreamItem::Error(error));
    }

    fn complete(&mut self) {
        self.phase = DispatchPhase::Finished;
        match self.pipeline.finish() {
            Ok(segments) => {
                self.emit_segments(segments);
                let state = self.pipeline.state();
                info!(
                    segments = state.segments_emitted(),
                    elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Stream complete"
                );
                self.ready.push_back(StreamItem::Done {
                    final_response: state.final_response().to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Refusal detected at end of stream");
                self.abort(e);
            }
        }
    }

    /// Advance until at least one item is ready or the stream is over
    async fn step(&mut self) {
        match std::mem::replace(&mut self.phase, DispatchPhase::Finished) {
            DispatchPhase::Connecting { backend, request } => {
                if request.is_blank() {
                    warn!("Rejecting request without a prompt");
                    self.abort(StreamError::InvalidPrompt(INVALID_PROMPT_MESSAGE.to_string()));
                    return;
                }
                debug!(backend = backend.name(), "Opening provider stream");
                match backend.send_streaming(&request).await {
                    Ok(tokens) => self.phase = DispatchPhase::Streaming { tokens },
                    Err(e) => {
                        error!(backend = backend.name(), error = %e, "Failed to open provider stream");
                        self.abort(StreamError::ProviderConnection(e.to_string()));
                    }
                }
            }
            DispatchPhase::Streaming { mut tokens } => match tokens.recv().await {
                Some(StreamingToken::Token(delta)) => match self.pipeline.feed(&delta) {
                    Ok(segments) => {
                        self.emit_segments(segments);
                        self.phase = DispatchPhase::Streaming { tokens };
                    }
                    Err(e) => {
                        warn!(error = %e, "Refusal detected, aborting stream");
                        self.abort(e);
                    }
                },
                Some(StreamingToken::Complete { .. }) | None => self.complete(),
                Some(StreamingToken::Error(message)) => {
                    error!(error = %message, "Provider failed mid-stream");
                    self.abort(StreamError::ProviderMidStream(message));
                }
            },
            DispatchPhase::Finished => {}
        }
    }

    async fn next_item(mut self) -> Option<(StreamItem, Self)> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some((item, self));
            }
            if matches!(self.phase, DispatchPhase::Finished) {
                return None;
            }
            self.step().await;
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Turns chat requests into segment streams against one backend
#[derive(Clone)]
pub struct StreamDispatcher {
    backend: Arc<dyn LlmBackend>,
    options: DispatchOptions,
}

impl StreamDispatcher {
    /// Dispatcher for a backend
    pub fn new(backend: Arc<dyn LlmBackend>, options: DispatchOptions) -> Self {
        Self { backend, options }
    }

    /// Active options
    #[must_use]
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Start a stream for `request`
    ///
    /// The returned stream yields zero or more [`StreamItem::Segment`]s and
    /// then exactly one terminal item: [`StreamItem::Done`] or
    /// [`StreamItem::Error`].
    #[must_use]
    pub fn dispatch(&self, request: ChatRequest) -> BoxStream<'static, StreamItem> {
        let span = info_span!(
            "stream",
            stream_id = %Uuid::new_v4(),
            mode = %self.options.mode,
            model = %request.model,
        );
        let dispatch = Dispatch {
            phase: DispatchPhase::Connecting {
                backend: Arc::clone(&self.backend),
                request,
            },
            pipeline: self.options.pipeline(),
            ready: VecDeque::new(),
            started: Instant::now(),
        };
        unfold_in_span(dispatch, span)
    }
}

fn unfold_in_span(dispatch: Dispatch, span: Span) -> BoxStream<'static, StreamItem> {
    stream::unfold(dispatch, move |dispatch| dispatch.next_item().instrument(span.clone())).boxed()
}

impl std::fmt::Debug for StreamDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDispatcher")
            .field("backend", &self.backend.name())
            .field("options", &self.options)
            .finish()
    }
}
