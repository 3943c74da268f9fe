//! Periodic flush driver for the aggregation buffer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::buffer::IngestionBuffer;

/// Owns the background task that flushes the [`IngestionBuffer`] every
/// batch interval. Shutdown is cooperative: [`stop`] signals the loop,
/// waits for any in-flight flush to finish, then drains the buffer, so
/// no detached chunk is ever dropped mid-store.
///
/// [`stop`]: IngestionService::stop
pub struct IngestionService {
    buffer: Arc<IngestionBuffer>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl IngestionService {
    pub fn start(buffer: Arc<IngestionBuffer>, batch_duration_secs: f64) -> Self {
        let period = Duration::from_secs_f64(batch_duration_secs.max(0.001));
        let (shutdown, mut stopped) = watch::channel(false);
        let task_buffer = buffer.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately, skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("batch interval elapsed, flushing");
                        task_buffer.flush().await;
                    }
                    _ = stopped.changed() => break,
                }
            }
        });
        info!(period_secs = batch_duration_secs, "ingestion service started");
        Self {
            buffer,
            shutdown,
            task,
        }
    }

    /// Stops the interval loop, waits for it to exit, then drains
    /// whatever the current window holds. A flush already in progress
    /// completes before the loop observes the signal.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
        self.buffer.flush().await;
        info!("ingestion service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::ingest::store::{ChunkMetadata, MemoryVectorStore, VectorStore};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    #[tokio::test(start_paused = true)]
    async fn test_interval_flushes_accumulated_context() {
        let store = Arc::new(MemoryVectorStore::new());
        let buffer = Arc::new(IngestionBuffer::new(store.clone(), 10.0));
        let service = IngestionService::start(buffer.clone(), 10.0);

        buffer.append_transcript("tick one").await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(store.len(), 1);

        buffer.append_transcript("tick two").await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.len(), 2);

        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_drains_partial_window() {
        let store = Arc::new(MemoryVectorStore::new());
        let buffer = Arc::new(IngestionBuffer::new(store.clone(), 10.0));
        let service = IngestionService::start(buffer.clone(), 10.0);

        buffer.append_transcript("written just before shutdown").await;
        service.stop().await;

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].document.contains("written just before shutdown"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_intervals_store_nothing() {
        let store = Arc::new(MemoryVectorStore::new());
        let buffer = Arc::new(IngestionBuffer::new(store.clone(), 10.0));
        let service = IngestionService::start(buffer.clone(), 10.0);

        tokio::time::sleep(Duration::from_secs(35)).await;
        service.stop().await;
        assert!(store.is_empty());
    }

    /// Store whose writes block until released, to hold a flush in flight.
    struct GatedStore {
        inner: MemoryVectorStore,
        gate: Notify,
    }

    #[async_trait]
    impl VectorStore for GatedStore {
        async fn store(&self, document: &str, metadata: ChunkMetadata, id: &str) -> Result<()> {
            self.gate.notified().await;
            self.inner.store(document, metadata, id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_flush() {
        let store = Arc::new(GatedStore {
            inner: MemoryVectorStore::new(),
            gate: Notify::new(),
        });
        let buffer = Arc::new(IngestionBuffer::new(store.clone(), 5.0));
        let service = IngestionService::start(buffer.clone(), 5.0);

        // The periodic flush detaches the chunk and blocks inside store().
        buffer.append_transcript("detached but not yet stored").await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(store.inner.is_empty());

        // Stop while the write is in flight, then release it.
        let stopping = tokio::spawn(service.stop());
        tokio::task::yield_now().await;
        store.gate.notify_one();
        stopping.await.unwrap();

        let entries = store.inner.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].document.contains("detached but not yet stored"));
    }
}
