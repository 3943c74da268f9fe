//! Audio frame decoding and voice-activity gating.

pub mod vad;

pub use vad::{Clock, GateResult, SystemClock, VoiceGate, VoiceGateConfig};
