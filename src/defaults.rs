//! Default configuration constants for streamscribe.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16_000;

/// Bytes per incoming PCM sample.
///
/// Clients stream 32-bit float little-endian samples, so every sample
/// occupies four bytes on the wire.
pub const BYTES_PER_SAMPLE: u32 = 4;

/// Default silence threshold on the smoothed RMS scale (0.0 to 1.0).
///
/// 0.015 works for quiet rooms with typical microphone input levels.
/// Raise towards 0.03 for noisy environments.
pub const SILENCE_THRESHOLD: f32 = 0.015;

/// Smoothing factor for the exponential energy average.
///
/// `smoothed = alpha * current + (1 - alpha) * previous`. Smoothing keeps a
/// single loud or quiet frame from flapping the speech classification during
/// the micro-pauses of natural speech.
pub const ENERGY_SMOOTHING: f32 = 0.2;

/// Default maximum buffered audio before a transcription pass, in seconds.
pub const MAX_BUFFER_SECS: f32 = 4.0;

/// Default minimum buffered audio required for a pause-triggered pass,
/// in seconds. Lets short utterances be transcribed promptly instead of
/// waiting for the buffer to fill.
pub const MIN_BUFFER_SECS: f32 = 2.0;

/// Default pause after speech ends before triggering transcription,
/// in seconds. Tuning placeholder; no empirical procedure exists yet.
pub const PAUSE_SECS: f32 = 1.0;

/// Consecutive silent frame batches before the stream buffer hard-resets.
///
/// Roughly twice the pause window at typical ~0.5s frame batches. A hard
/// reset reclaims memory and keeps unrelated utterances from being stitched
/// together. Tuning placeholder; no empirical procedure exists yet.
pub const LONG_SILENCE_FRAMES: u32 = 10;

/// Fraction of the buffer retained after each transcription pass.
///
/// Words spanning a window boundary stay in context for the next pass;
/// the reconciler de-duplicates the resulting overlap.
pub const OVERLAP_FRACTION: f32 = 0.375;

/// Tolerance when extracting new segments past the watermark, in seconds.
///
/// Intentionally generous: utterance boundaries rarely land exactly on
/// frame boundaries.
pub const TIMESTAMP_TOLERANCE_SECS: f64 = 0.3;

/// Default maximum number of concurrent transcription passes.
///
/// Bounds the blocking worker pool independently of connection count.
pub const MAX_CONCURRENT_TRANSCRIPTIONS: usize = 2;

/// Default context aggregation window, in seconds.
pub const BATCH_DURATION_SECS: f64 = 10.0;

/// Default listen address for the server.
pub const LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default language code for transcription.
///
/// "auto" lets the engine detect the spoken language automatically.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";
