//! Segment Pipeline
//!
//! The synchronous half of a stream: deltas go in, complete segments come
//! out. The pipeline owns the accumulation buffer, the stream state and the
//! refusal check for exactly one stream. It knows nothing about providers or
//! transports, which keeps every segmentation rule testable without a
//! runtime.
//!
//! # Refusal check
//!
//! The check runs on the leading content of the stream, before any segment
//! is produced. While the leading content could still grow into a preamble
//! the pipeline holds its output back; once the verdict is in, the check is
//! spent for the rest of the stream.

use super::accumulator::ChunkAccumulator;
use super::refusal::{RefusalDetector, RefusalVerdict};
use super::segmenter::{segmenter_for, Extraction, Segmenter, SegmenterOptions};
use super::types::{Segment, SegmentMode, StreamError, StreamState};

/// Per-stream segmentation state machine
pub struct SegmentPipeline {
    segmenter: Box<dyn Segmenter>,
    detector: RefusalDetector,
    accumulator: ChunkAccumulator,
    state: StreamState,
}

impl SegmentPipeline {
    /// Pipeline over an arbitrary segmenter
    #[must_use]
    pub fn new(segmenter: Box<dyn Segmenter>, detector: RefusalDetector) -> Self {
        let mode = segmenter.mode();
        Self {
            segmenter,
            detector,
            accumulator: ChunkAccumulator::new(),
            state: StreamState::new(mode),
        }
    }

    /// Pipeline over one of the built-in segmenters
    #[must_use]
    pub fn for_mode(
        mode: SegmentMode,
        options: SegmenterOptions,
        detector: RefusalDetector,
    ) -> Self {
        Self::new(segmenter_for(mode, options), detector)
    }

    /// Feed one delta, returning the segments it completed
    ///
    /// # Errors
    ///
    /// [`StreamError::RefusalDetected`] when the stream opens with a refusal
    /// preamble. The pipeline must not be fed after an error.
    pub fn feed(&mut self, delta: &str) -> Result<Vec<Segment>, StreamError> {
        if delta.is_empty() {
            return Ok(Vec::new());
        }
        self.accumulator.append(delta);

        if !self.state.refusal_checked() && !self.settle_refusal(false)? {
            return Ok(Vec::new());
        }
        Ok(self.extract())
    }

    /// End the stream, returning whatever the end-of-stream rule releases
    ///
    /// # Errors
    ///
    /// [`StreamError::RefusalDetected`] when the refusal verdict was still
    /// pending and the buffered content turns out to be a refusal.
    pub fn finish(&mut self) -> Result<Vec<Segment>, StreamError> {
        if !self.state.refusal_checked() {
            self.settle_refusal(true)?;
        }

        let mut segments = self.extract();
        let remainder = self.accumulator.take();
        if let Some(last) = self.segmenter.flush(&remainder) {
            self.state.record_final(&last);
            segments.push(last);
        }
        Ok(segments)
    }

    /// Bookkeeping for the stream so far
    #[must_use]
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Active mode
    #[must_use]
    pub fn mode(&self) -> SegmentMode {
        self.state.mode()
    }

    /// Text buffered but not yet emitted
    #[must_use]
    pub fn buffered(&self) -> &str {
        self.accumulator.as_str()
    }

    /// Consume the pipeline, returning its state
    #[must_use]
    pub fn into_state(self) -> StreamState {
        self.state
    }

    /// Returns `Ok(true)` once the check is spent, `Ok(false)` while it waits
    fn settle_refusal(&mut self, at_end: bool) -> Result<bool, StreamError> {
        match self.detector.verdict(self.accumulator.as_str()) {
            RefusalVerdict::Refused(preamble) => {
                let preamble = preamble.to_string();
                self.state.mark_refusal_checked();
                Err(StreamError::RefusalDetected { preamble })
            }
            RefusalVerdict::Undecided if !at_end => Ok(false),
            RefusalVerdict::Undecided | RefusalVerdict::Clear => {
                self.state.mark_refusal_checked();
                Ok(true)
            }
        }
    }

    fn extract(&mut self) -> Vec<Segment> {
        let Extraction {
            segments,
            remainder,
        } = self.segmenter.extract(self.accumulator.as_str());
        self.accumulator.replace(remainder);
        for segment in &segments {
            self.state.record(segment);
        }
        segments
    }
}

impl std::fmt::Debug for SegmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentPipeline")
            .field("mode", &self.state.mode())
            .field("buffered", &self.accumulator.len())
            .field("segments_emitted", &self.state.segments_emitted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sentence_pipeline() -> SegmentPipeline {
        SegmentPipeline::for_mode(
            SegmentMode::Sentence,
            SegmenterOptions::default(),
            RefusalDetector::default(),
        )
    }

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(Segment::as_str).collect()
    }

    #[test]
    fn test_feed_yields_as_sentences_complete() {
        let mut pipeline = sentence_pipeline();

        assert!(pipeline.feed("The cat ").unwrap().is_empty());
        let out = pipeline.feed("sat. The dog").unwrap();
        assert_eq!(texts(&out), vec!["The cat sat."]);
        assert_eq!(pipeline.buffered(), "The dog");

        let out = pipeline.finish().unwrap();
        assert_eq!(texts(&out), vec!["The dog"]);
        assert_eq!(pipeline.state().final_response(), "The cat sat. The dog");
        assert_eq!(pipeline.state().segments_emitted(), 2);
    }

    #[test]
    fn test_empty_deltas_are_skipped() {
        let mut pipeline = sentence_pipeline();
        assert!(pipeline.feed("").unwrap().is_empty());
        assert!(!pipeline.state().refusal_checked());
        assert!(pipeline.finish().unwrap().is_empty());
    }

    #[test]
    fn test_refusal_split_across_deltas() {
        let mut pipeline = sentence_pipeline();
        assert!(pipeline.feed(" I'm").unwrap().is_empty());
        let err = pipeline.feed(" sorry, I can't.").unwrap_err();
        assert_eq!(
            err,
            StreamError::RefusalDetected {
                preamble: "I'm sorry".into()
            }
        );
    }

    #[test]
    fn test_refusal_check_is_spent_after_first_content() {
        let mut pipeline = sentence_pipeline();
        let out = pipeline.feed("Fine. ").unwrap();
        assert_eq!(texts(&out), vec!["Fine."]);
        assert!(pipeline.state().refusal_checked());

        let out = pipeline.feed("I'm sorry. ").unwrap();
        assert_eq!(texts(&out), vec!["I'm sorry."]);
    }

    #[test]
    fn test_undecided_prefix_is_released_at_end() {
        let mut pipeline = sentence_pipeline();
        assert!(pipeline.feed("I'm").unwrap().is_empty());
        let out = pipeline.finish().unwrap();
        assert_eq!(texts(&out), vec!["I'm"]);
    }

    #[test]
    fn test_json_pipeline_records_objects() {
        let mut pipeline = SegmentPipeline::for_mode(
            SegmentMode::Json,
            SegmenterOptions::default(),
            RefusalDetector::default(),
        );
        let out = pipeline.feed(r#"[{"type":"action","#).unwrap();
        assert!(out.is_empty());
        let out = pipeline.feed(r#" "text":"Run."}]"#).unwrap();
        assert_eq!(texts(&out), vec![r#"{"type": "action", "text": "Run."}"#]);

        assert!(pipeline.finish().unwrap().is_empty());
        assert_eq!(pipeline.mode(), SegmentMode::Json);
    }
}
