//! Storage collaborator contract.
//!
//! The aggregation side never talks to a concrete database. It hands
//! finished documents to a [`VectorStore`], and the binary wires in
//! either an HTTP-backed store or the in-memory one used by tests.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Result, StreamscribeError};

/// Metadata stored alongside each chunk document.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMetadata {
    /// Window open time, RFC 3339.
    pub start_time: String,
    /// Window close time, RFC 3339.
    pub end_time: String,
    pub session_id: String,
    /// Always `"mixed"`: chunks interleave visual and audio context.
    pub content_type: String,
    pub transcript_count: usize,
    pub frame_count: usize,
    pub duration_secs: f64,
}

/// Write-side contract for whatever holds the aggregated context.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn store(&self, document: &str, metadata: ChunkMetadata, id: &str) -> Result<()>;
}

/// Posts chunk documents to an external store over HTTP.
pub struct HttpVectorStore {
    client: reqwest::Client,
    url: String,
}

impl HttpVectorStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[derive(Serialize)]
struct StoreRequest<'a> {
    id: &'a str,
    document: &'a str,
    metadata: &'a ChunkMetadata,
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn store(&self, document: &str, metadata: ChunkMetadata, id: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&StoreRequest {
                id,
                document,
                metadata: &metadata,
            })
            .send()
            .await
            .map_err(|e| StreamscribeError::StoreWriteFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StreamscribeError::StoreWriteFailed {
                message: format!("store returned {}", response.status()),
            });
        }
        Ok(())
    }
}

/// In-memory store. Used by tests and as a fallback when no store URL
/// is configured, so the server stays usable without a backend.
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: std::sync::Mutex<Vec<StoredChunk>>,
}

#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub document: String,
    pub metadata_json: String,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<StoredChunk> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn store(&self, document: &str, metadata: ChunkMetadata, id: &str) -> Result<()> {
        let metadata_json =
            serde_json::to_string(&metadata).map_err(|e| StreamscribeError::StoreWriteFailed {
                message: e.to_string(),
            })?;
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(StoredChunk {
                id: id.to_string(),
                document: document.to_string(),
                metadata_json,
            });
        Ok(())
    }
}

/// Test double that always fails, for exercising the swallow-and-log
/// path in the ingestion buffer.
#[cfg(test)]
pub struct FailingVectorStore;

#[cfg(test)]
#[async_trait]
impl VectorStore for FailingVectorStore {
    async fn store(&self, _document: &str, _metadata: ChunkMetadata, _id: &str) -> Result<()> {
        Err(StreamscribeError::StoreWriteFailed {
            message: "store unavailable".into(),
        })
    }
}
