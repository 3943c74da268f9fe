//! Transcriber trait and result types.

use crate::error::{Result, StreamscribeError};
use std::sync::Arc;

/// One timestamped utterance within a transcription pass.
///
/// Timestamps are in seconds, relative to the start of the audio window
/// handed to the engine, ordered oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Full result of one transcription pass.
#[derive(Debug, Clone, Default)]
pub struct Transcription {
    /// The complete recognized text.
    pub text: String,
    /// Per-utterance segments; empty when the engine has no timestamps.
    pub segments: Vec<TranscriptSegment>,
}

impl Transcription {
    /// End time of the last segment, if any.
    pub fn last_segment_end(&self) -> Option<f64> {
        self.segments.last().map(|s| s.end)
    }
}

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real Whisper vs mock).
/// Calls may block for the duration of model inference; callers dispatch
/// through [`crate::stt::TranscriptionBoundary`] rather than invoking
/// directly from async context.
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples to text.
    ///
    /// # Arguments
    /// * `audio` - f32 PCM samples at 16kHz mono, normalized to [-1.0, 1.0]
    fn transcribe(&self, audio: &[f32]) -> Result<Transcription>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across connections.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[f32]) -> Result<Transcription> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    responses: Vec<Transcription>,
    call_index: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    should_fail: bool,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            responses: vec![Transcription {
                text: "mock transcription".to_string(),
                segments: Vec::new(),
            }],
            call_index: Default::default(),
            should_fail: false,
        }
    }

    /// Configure the mock to return a specific text (no timestamps)
    pub fn with_response(mut self, text: &str) -> Self {
        self.responses = vec![Transcription {
            text: text.to_string(),
            segments: Vec::new(),
        }];
        self
    }

    /// Configure the mock to return a sequence of results, one per call.
    /// The last result repeats once the sequence is exhausted.
    pub fn with_sequence(mut self, responses: Vec<Transcription>) -> Self {
        self.responses = responses;
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &[f32]) -> Result<Transcription> {
        if self.should_fail {
            return Err(StreamscribeError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }
        let index = self
            .call_index
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let last = self.responses.len().saturating_sub(1);
        Ok(self.responses[index.min(last)].clone())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
