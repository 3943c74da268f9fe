//! Voice activity gating.
//!
//! Classifies incoming audio frames as speech or silence using RMS energy
//! with exponential smoothing, so a single loud or quiet frame cannot flap
//! the classification during the micro-pauses of natural speech.

use crate::defaults;
use std::time::Instant;

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Configuration for the voice gate.
#[derive(Debug, Clone, Copy)]
pub struct VoiceGateConfig {
    /// Smoothed-RMS threshold for detecting speech (0.0 to 1.0).
    pub silence_threshold: f32,
    /// Exponential smoothing factor alpha (0.0 to 1.0).
    pub energy_smoothing: f32,
}

impl Default for VoiceGateConfig {
    fn default() -> Self {
        Self {
            silence_threshold: defaults::SILENCE_THRESHOLD,
            energy_smoothing: defaults::ENERGY_SMOOTHING,
        }
    }
}

/// Result of classifying one frame.
#[derive(Debug, Clone, Copy)]
pub struct GateResult {
    /// Instantaneous RMS of the frame (0.0 to 1.0).
    pub energy: f32,
    /// Exponentially smoothed RMS.
    pub smoothed_energy: f32,
    /// Whether the smoothed energy crosses the speech threshold.
    pub is_speech: bool,
}

/// Voice gate maintaining the smoothed energy across frames.
#[derive(Debug)]
pub struct VoiceGate {
    config: VoiceGateConfig,
    smoothed: f32,
}

impl VoiceGate {
    /// Creates a gate with default configuration.
    pub fn new() -> Self {
        Self::with_config(VoiceGateConfig::default())
    }

    /// Creates a gate with custom configuration.
    pub fn with_config(config: VoiceGateConfig) -> Self {
        Self {
            config,
            smoothed: 0.0,
        }
    }

    /// Classifies one frame of samples.
    pub fn classify(&mut self, samples: &[f32]) -> GateResult {
        let energy = calculate_rms(samples);
        let alpha = self.config.energy_smoothing;
        self.smoothed = alpha * energy + (1.0 - alpha) * self.smoothed;

        GateResult {
            energy,
            smoothed_energy: self.smoothed,
            is_speech: self.smoothed >= self.config.silence_threshold,
        }
    }

    /// Resets the smoothed energy to zero.
    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}

impl Default for VoiceGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// Samples are expected to be normalized to [-1.0, 1.0] already (f32 PCM).
/// Non-finite samples are treated as zero rather than poisoning the mean.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let s = if sample.is_finite() { sample as f64 } else { 0.0 };
            s * s
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Decodes a raw frame of little-endian f32 PCM bytes.
///
/// A trailing partial sample is dropped: malformed frames degrade to
/// best-effort decoding instead of terminating the connection.
pub fn decode_frame(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_frame(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_rms_silence_is_zero() {
        let silence = vec![0.0f32; 1000];
        assert_eq!(calculate_rms(&silence), 0.0);
    }

    #[test]
    fn test_rms_full_scale() {
        let signal = vec![1.0f32; 1000];
        let rms = calculate_rms(&signal);
        assert!((rms - 1.0).abs() < 0.001, "RMS should be ~1.0, got {}", rms);
    }

    #[test]
    fn test_rms_mixed_positive_negative() {
        let mut mixed = vec![0.03f32; 500];
        mixed.extend(vec![-0.03f32; 500]);
        let rms = calculate_rms(&mixed);
        assert!((rms - 0.03).abs() < 0.001, "RMS should be ~0.03, got {}", rms);
    }

    #[test]
    fn test_rms_empty_samples() {
        assert_eq!(calculate_rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_ignores_non_finite() {
        let samples = vec![f32::NAN, f32::INFINITY, 0.0, 0.0];
        let rms = calculate_rms(&samples);
        assert!(rms.is_finite());
        assert_eq!(rms, 0.0);
    }

    #[test]
    fn test_decode_frame_roundtrip() {
        let samples = vec![0.0f32, 0.5, -0.5, 1.0];
        let bytes = encode_frame(&samples);
        assert_eq!(decode_frame(&bytes), samples);
    }

    #[test]
    fn test_decode_frame_drops_partial_sample() {
        let mut bytes = encode_frame(&[0.25f32]);
        bytes.extend_from_slice(&[0xAA, 0xBB]); // truncated trailing sample
        let samples = decode_frame(&bytes);
        assert_eq!(samples, vec![0.25f32]);
    }

    #[test]
    fn test_decode_frame_empty() {
        assert!(decode_frame(&[]).is_empty());
    }

    #[test]
    fn test_gate_starts_silent() {
        let mut gate = VoiceGate::new();
        let result = gate.classify(&vec![0.0f32; 160]);
        assert!(!result.is_speech);
        assert_eq!(result.smoothed_energy, 0.0);
    }

    #[test]
    fn test_gate_detects_sustained_speech() {
        let mut gate = VoiceGate::new();
        let loud = vec![0.1f32; 160];

        // Smoothing means a few frames are needed to cross the threshold.
        let mut is_speech = false;
        for _ in 0..5 {
            is_speech = gate.classify(&loud).is_speech;
        }
        assert!(is_speech);
    }

    #[test]
    fn test_gate_single_loud_frame_does_not_flap() {
        let config = VoiceGateConfig {
            silence_threshold: 0.05,
            energy_smoothing: 0.2,
        };
        let mut gate = VoiceGate::with_config(config);

        // A lone loud frame after silence: smoothed = 0.2 * 0.1 = 0.02 < 0.05
        let result = gate.classify(&vec![0.1f32; 160]);
        assert!(!result.is_speech);
        assert!((result.smoothed_energy - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_gate_single_quiet_frame_keeps_speech() {
        let mut gate = VoiceGate::new();
        let loud = vec![0.1f32; 160];
        for _ in 0..10 {
            gate.classify(&loud);
        }

        // One silent micro-pause frame should not drop below threshold.
        let result = gate.classify(&vec![0.0f32; 160]);
        assert!(result.is_speech);
    }

    #[test]
    fn test_gate_reset() {
        let mut gate = VoiceGate::new();
        for _ in 0..10 {
            gate.classify(&vec![0.1f32; 160]);
        }
        gate.reset();
        let result = gate.classify(&vec![0.0f32; 160]);
        assert_eq!(result.smoothed_energy, 0.0);
    }
}
