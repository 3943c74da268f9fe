//! Per-connection streaming state machine.
//!
//! Owns one connection's gate, buffer, and reconciler exclusively; no locks.
//! The await on the transcription boundary is the only suspension point in
//! a frame's handling.

use crate::audio::vad::{Clock, SystemClock, VoiceGate, VoiceGateConfig, decode_frame};
use crate::config::Config;
use crate::streaming::buffer::{BufferEvent, StreamBuffer, StreamBufferConfig};
use crate::streaming::reconciler::Reconciler;
use crate::stt::boundary::TranscriptionBoundary;
use std::time::Duration;
use tracing::{debug, trace};

/// Streaming state for one client connection.
pub struct StreamSession<C: Clock = SystemClock> {
    gate: VoiceGate,
    buffer: StreamBuffer<C>,
    reconciler: Reconciler,
    boundary: TranscriptionBoundary,
    /// Stream bytes per second of audio, for mapping byte positions to time.
    bytes_per_sec: f64,
    /// Total bytes buffered so far, i.e. the stream position of the buffer end.
    stream_bytes: u64,
    rounds: u64,
}

impl StreamSession<SystemClock> {
    /// Builds a session from the application configuration.
    pub fn new(config: &Config, boundary: TranscriptionBoundary) -> Self {
        let gate = VoiceGate::with_config(VoiceGateConfig {
            silence_threshold: config.audio.silence_threshold,
            energy_smoothing: config.audio.energy_smoothing,
        });
        let buffer = StreamBuffer::new(StreamBufferConfig {
            max_buffer_bytes: config.max_buffer_bytes(),
            min_buffer_bytes: config.min_buffer_bytes(),
            pause: Duration::from_secs_f32(config.stream.pause_secs),
            long_silence_frames: config.stream.long_silence_frames,
            overlap_fraction: config.stream.overlap_fraction,
        });
        let reconciler = Reconciler::with_tolerance(config.stream.timestamp_tolerance_secs);
        let bytes_per_sec = (config.audio.sample_rate * config.audio.bytes_per_sample) as f64;
        Self::from_parts(gate, buffer, reconciler, boundary, bytes_per_sec)
    }
}

impl<C: Clock> StreamSession<C> {
    /// Assembles a session from already-built components (tests use a mock
    /// clock through the buffer).
    pub fn from_parts(
        gate: VoiceGate,
        buffer: StreamBuffer<C>,
        reconciler: Reconciler,
        boundary: TranscriptionBoundary,
        bytes_per_sec: f64,
    ) -> Self {
        Self {
            gate,
            buffer,
            reconciler,
            boundary,
            bytes_per_sec: bytes_per_sec.max(1.0),
            stream_bytes: 0,
            rounds: 0,
        }
    }

    /// Ingests one raw audio frame and returns the new transcript delta,
    /// if this frame triggered a transcription pass that produced one.
    pub async fn ingest(&mut self, frame: &[u8]) -> Option<String> {
        let samples = decode_frame(frame);
        let result = self.gate.classify(&samples);
        trace!(
            energy = result.energy,
            smoothed = result.smoothed_energy,
            is_speech = result.is_speech,
            "frame classified"
        );

        if self.buffer.observe(result.is_speech) == BufferEvent::HardReset {
            debug!("long silence, stream state reset");
            self.reconciler.reset();
            return None;
        }

        self.buffer.push(frame);
        self.stream_bytes += frame.len() as u64;

        if !self.buffer.should_process() {
            return None;
        }

        let window = self.buffer.take_window();
        let sample_count = window.len() / 4;
        // Engine timestamps are relative to this window. The buffer always
        // holds the stream's tail, so the window start in stream time is the
        // total bytes ingested minus the window length.
        let window_start = (self.stream_bytes - window.len() as u64) as f64 / self.bytes_per_sec;
        let transcription = self.boundary.transcribe(decode_frame(&window)).await;
        self.buffer.retain_overlap();
        self.rounds += 1;

        let mut transcription = transcription?;
        for segment in &mut transcription.segments {
            segment.start += window_start;
            segment.end += window_start;
        }
        let delta = self.reconciler.reconcile(&transcription);
        debug!(
            round = self.rounds,
            samples = sample_count,
            emitted = delta.is_some(),
            "transcription pass complete"
        );
        delta
    }

    /// Number of transcription passes this session has run.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Current reconciler watermark, for diagnostics.
    pub fn watermark(&self) -> f64 {
        self.reconciler.watermark()
    }
}
