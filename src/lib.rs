//! streamscribe - Streaming transcription and context aggregation server
//!
//! Accepts raw f32 PCM audio over websockets, emits incremental
//! transcript deltas, and batches them together with visual frame
//! descriptions into documents for an external store.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod ingest;
pub mod server;
pub mod streaming;
pub mod stt;

// Core pipeline (gate → buffer → boundary → reconciler)
pub use audio::vad::{Clock, SystemClock, VoiceGate};
pub use streaming::{Reconciler, StreamBuffer, StreamSession};
pub use stt::{Transcriber, Transcription, TranscriptionBoundary};

// Aggregation
pub use ingest::{IngestionBuffer, IngestionService, VectorStore};

// Error handling
pub use error::{Result, StreamscribeError};

// Config
pub use config::Config;
