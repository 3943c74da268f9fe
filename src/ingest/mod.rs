//! Context aggregation: batching transcript deltas and frame
//! descriptions into stored documents.

pub mod buffer;
pub mod chunk;
pub mod service;
pub mod store;

pub use buffer::IngestionBuffer;
pub use chunk::ContextChunk;
pub use service::IngestionService;
pub use store::{ChunkMetadata, HttpVectorStore, MemoryVectorStore, VectorStore};
