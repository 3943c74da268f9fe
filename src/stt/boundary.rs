//! Transcription dispatch boundary.
//!
//! The engine call may block for the duration of model inference, so it runs
//! on tokio's blocking thread pool, bounded by a semaphore sized
//! independently of connection count. A connection awaiting its result
//! suspends only itself; frame ingestion on other connections continues.
//!
//! Engine failures are caught here: they are logged and collapse to "no new
//! text this round", and the connection keeps streaming.

use crate::defaults;
use crate::stt::transcriber::{Transcriber, Transcription};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

/// Shared, cloneable handle to the bounded transcription pool.
#[derive(Clone)]
pub struct TranscriptionBoundary {
    transcriber: Arc<dyn Transcriber>,
    permits: Arc<Semaphore>,
}

impl TranscriptionBoundary {
    /// Creates a boundary with the default concurrency bound.
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self::with_concurrency(transcriber, defaults::MAX_CONCURRENT_TRANSCRIPTIONS)
    }

    /// Creates a boundary with a custom concurrency bound.
    pub fn with_concurrency(transcriber: Arc<dyn Transcriber>, max_concurrent: usize) -> Self {
        Self {
            transcriber,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Transcribes one audio window.
    ///
    /// Returns `None` on engine error or panic; the failure is logged and
    /// the round contributes zero delta.
    pub async fn transcribe(&self, samples: Vec<f32>) -> Option<Transcription> {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed while the boundary is alive.
            Err(_) => return None,
        };

        let transcriber = self.transcriber.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit; // hold until inference completes
            transcriber.transcribe(&samples)
        })
        .await;

        match result {
            Ok(Ok(transcription)) => Some(transcription),
            Ok(Err(e)) => {
                warn!(error = %e, "transcription failed, skipping round");
                None
            }
            Err(e) => {
                warn!(error = %e, "transcription task panicked, skipping round");
                None
            }
        }
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.transcriber.model_name()
    }

    /// Whether the underlying engine is ready.
    pub fn is_ready(&self) -> bool {
        self.transcriber.is_ready()
    }
}
