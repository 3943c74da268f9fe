//! Per-connection streaming transcription pipeline.
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌───────────────┐    ┌────────────┐
//! │   Voice    │───▶│  Adaptive  │───▶│ Transcription │───▶│ Reconciler │───▶ delta
//! │   Gate     │    │  Buffer    │    │   Boundary    │    │            │
//! └────────────┘    └────────────┘    └───────────────┘    └────────────┘
//!                        │                  (bounded,
//!                        └── trigger ──────  async)
//! ```
//!
//! Every live connection owns one [`StreamSession`]; the only shared piece
//! is the transcription boundary's worker pool.

pub mod buffer;
pub mod reconciler;
pub mod session;

pub use buffer::{BufferEvent, StreamBuffer, StreamBufferConfig};
pub use reconciler::Reconciler;
pub use session::StreamSession;
