//! Session-wide aggregation buffer.
//!
//! All websocket connections and frame-description posts feed one shared
//! [`IngestionBuffer`]. The lock guards only the current chunk: a flush
//! swaps in a fresh chunk while holding it, then renders and stores the
//! detached chunk with the lock released, so appends are never blocked
//! on store latency.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::chunk::ContextChunk;
use super::store::{ChunkMetadata, VectorStore};

pub struct IngestionBuffer {
    current: Mutex<Option<ContextChunk>>,
    store: Arc<dyn VectorStore>,
    session_id: String,
    batch_duration: TimeDelta,
    /// Monotonic flush counter; keeps chunk ids unique even when two
    /// flushes land within the same millisecond.
    sequence: AtomicU64,
}

impl IngestionBuffer {
    pub fn new(store: Arc<dyn VectorStore>, batch_duration_secs: f64) -> Self {
        Self {
            current: Mutex::new(None),
            store,
            session_id: Uuid::new_v4().to_string(),
            batch_duration: TimeDelta::milliseconds((batch_duration_secs * 1000.0) as i64),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn append_transcript(&self, text: impl Into<String>) {
        let mut guard = self.current.lock().await;
        self.chunk_mut(&mut guard).transcripts.push(text.into());
    }

    pub async fn append_frame_description(&self, description: impl Into<String>) {
        let mut guard = self.current.lock().await;
        self.chunk_mut(&mut guard)
            .frame_descriptions
            .push(description.into());
    }

    /// Opens the window lazily on first append so idle periods produce
    /// no chunks at all.
    fn chunk_mut<'a>(&self, guard: &'a mut Option<ContextChunk>) -> &'a mut ContextChunk {
        guard.get_or_insert_with(|| {
            let start = Utc::now();
            ContextChunk::new(start, start + self.batch_duration)
        })
    }

    /// Detaches the current chunk and stores it. Empty or absent chunks
    /// are skipped. Store failures are logged and swallowed: the stream
    /// must keep flowing even when the backend is down, at the cost of
    /// the lost chunk.
    pub async fn flush(&self) {
        let chunk = {
            let mut guard = self.current.lock().await;
            guard.take()
        };

        let Some(chunk) = chunk else {
            return;
        };
        if chunk.is_empty() {
            return;
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!("chunk_{}_{}", chunk.start.timestamp_millis(), sequence);
        let metadata = ChunkMetadata {
            start_time: chunk.start.to_rfc3339(),
            end_time: chunk.end.to_rfc3339(),
            session_id: self.session_id.clone(),
            content_type: "mixed".into(),
            transcript_count: chunk.transcripts.len(),
            frame_count: chunk.frame_descriptions.len(),
            duration_secs: chunk.duration_secs(),
        };
        let document = chunk.combined_text();

        debug!(
            id = %id,
            transcripts = metadata.transcript_count,
            frames = metadata.frame_count,
            "storing context chunk"
        );
        if let Err(e) = self.store.store(&document, metadata, &id).await {
            warn!(error = %e, id = %id, "failed to store context chunk, dropping it");
        }
    }
}
