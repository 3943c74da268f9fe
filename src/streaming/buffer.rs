//! Adaptive per-connection stream buffer.
//!
//! Accumulates raw audio bytes and decides when a transcription pass should
//! run. Silence is appended too — dropping it mid-utterance loses the
//! connective tissue of natural speech — but persistent silence hard-resets
//! the buffer so unrelated utterances are never stitched together.
//!
//! Two triggers:
//! - buffer-full: accumulated bytes reach the configured maximum window
//! - pause: enough audio is buffered, speech has ended, and the pause has
//!   lasted longer than the configured threshold
//!
//! After a pass, only a trailing overlap fraction is retained so words that
//! span the window boundary remain in context; the reconciler de-duplicates
//! the overlap.

use crate::audio::vad::{Clock, SystemClock};
use crate::defaults;
use std::time::{Duration, Instant};

/// Configuration for the stream buffer.
#[derive(Debug, Clone)]
pub struct StreamBufferConfig {
    /// Maximum buffered bytes; reaching this triggers a pass.
    pub max_buffer_bytes: usize,
    /// Minimum buffered bytes for the pause trigger.
    pub min_buffer_bytes: usize,
    /// Pause after speech ends before triggering a pass.
    pub pause: Duration,
    /// Consecutive silent frame batches before a hard reset.
    pub long_silence_frames: u32,
    /// Fraction of the buffer retained after a pass.
    pub overlap_fraction: f32,
}

impl Default for StreamBufferConfig {
    fn default() -> Self {
        let bytes_per_sec = (defaults::SAMPLE_RATE * defaults::BYTES_PER_SAMPLE) as f32;
        Self {
            max_buffer_bytes: (bytes_per_sec * defaults::MAX_BUFFER_SECS) as usize,
            min_buffer_bytes: (bytes_per_sec * defaults::MIN_BUFFER_SECS) as usize,
            pause: Duration::from_secs_f32(defaults::PAUSE_SECS),
            long_silence_frames: defaults::LONG_SILENCE_FRAMES,
            overlap_fraction: defaults::OVERLAP_FRACTION,
        }
    }
}

/// State transition observed while ingesting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// No state change.
    None,
    /// Silence -> speech transition.
    SpeechStarted,
    /// Speech -> silence transition.
    SpeechEnded,
    /// Long silence exceeded; buffer and downstream state must reset.
    HardReset,
}

/// Adaptive byte accumulator owned exclusively by one connection.
pub struct StreamBuffer<C: Clock = SystemClock> {
    config: StreamBufferConfig,
    clock: C,
    bytes: Vec<u8>,
    silence_frames: u32,
    speaking: bool,
    speech_ended_at: Option<Instant>,
}

impl StreamBuffer<SystemClock> {
    /// Creates a buffer with the given configuration and the system clock.
    pub fn new(config: StreamBufferConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> StreamBuffer<C> {
    /// Creates a buffer with the given configuration and clock.
    pub fn with_clock(config: StreamBufferConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            bytes: Vec::new(),
            silence_frames: 0,
            speaking: false,
            speech_ended_at: None,
        }
    }

    /// Observes the classification of an incoming frame and applies state
    /// transitions. Returns [`BufferEvent::HardReset`] when long silence
    /// cleared the buffer, so the caller can reset the reconciler too.
    pub fn observe(&mut self, is_speech: bool) -> BufferEvent {
        if is_speech {
            let started = !self.speaking;
            self.silence_frames = 0;
            self.speaking = true;
            self.speech_ended_at = None;
            if started {
                return BufferEvent::SpeechStarted;
            }
            return BufferEvent::None;
        }

        if self.speaking {
            self.speaking = false;
            self.speech_ended_at = Some(self.clock.now());
            return BufferEvent::SpeechEnded;
        }

        self.silence_frames += 1;
        if self.silence_frames > self.config.long_silence_frames {
            self.hard_reset();
            return BufferEvent::HardReset;
        }
        BufferEvent::None
    }

    /// Appends a frame's bytes; silence and speech alike.
    pub fn push(&mut self, frame: &[u8]) {
        self.bytes.extend_from_slice(frame);
    }

    /// Returns true when either processing trigger is satisfied.
    pub fn should_process(&self) -> bool {
        if self.bytes.len() >= self.config.max_buffer_bytes {
            return true;
        }

        if self.bytes.len() >= self.config.min_buffer_bytes
            && !self.speaking
            && let Some(ended_at) = self.speech_ended_at
        {
            return self.clock.now().duration_since(ended_at) >= self.config.pause;
        }

        false
    }

    /// Returns the most recent window of at most `max_buffer_bytes` bytes.
    pub fn take_window(&self) -> Vec<u8> {
        let start = self.bytes.len().saturating_sub(self.config.max_buffer_bytes);
        self.bytes[start..].to_vec()
    }

    /// Retains only the trailing overlap fraction after a pass.
    pub fn retain_overlap(&mut self) {
        let keep = (self.bytes.len() as f32 * self.config.overlap_fraction) as usize;
        let start = self.bytes.len() - keep;
        self.bytes.drain(..start);
        // A pause-triggered pass consumed the pending pause; require fresh
        // speech before the pause trigger can fire again.
        self.speech_ended_at = None;
    }

    /// Current buffered byte count.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True while speech is active.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    fn hard_reset(&mut self) {
        self.bytes.clear();
        self.bytes.shrink_to_fit();
        self.silence_frames = 0;
        self.speech_ended_at = None;
    }
}
