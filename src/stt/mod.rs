//! Speech-to-text collaborator boundary.

pub mod boundary;
pub mod transcriber;
pub mod whisper;

pub use boundary::TranscriptionBoundary;
pub use transcriber::{MockTranscriber, TranscriptSegment, Transcriber, Transcription};
pub use whisper::{WhisperConfig, WhisperTranscriber};
