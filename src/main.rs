use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use streamscribe::config::Config;
use streamscribe::ingest::{HttpVectorStore, IngestionBuffer, IngestionService, MemoryVectorStore, VectorStore};
use streamscribe::server::{AppState, router};
use streamscribe::stt::{TranscriptionBoundary, WhisperConfig, WhisperTranscriber};

const CONFIG_PATH: &str = "streamscribe.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let config = Config::load_or_default(Path::new(CONFIG_PATH))
        .context("failed to load configuration")?
        .with_env_overrides();
    config.validate().context("invalid configuration")?;
    let config = Arc::new(config);

    let transcriber = WhisperTranscriber::new(WhisperConfig {
        model_path: config.stt.model_path.clone(),
        language: config.stt.language.clone(),
        threads: config.stt.threads,
    })
    .context("failed to initialize transcription engine")?;
    let boundary = TranscriptionBoundary::with_concurrency(
        Arc::new(transcriber),
        config.stream.max_concurrent_transcriptions,
    );
    if !boundary.is_ready() {
        info!("transcription engine not ready, streaming will produce no deltas");
    }

    let store: Arc<dyn VectorStore> = match &config.server.store_url {
        Some(url) => {
            info!(%url, "using http vector store");
            Arc::new(HttpVectorStore::new(url.clone()))
        }
        None => {
            info!("no store_url configured, aggregated chunks stay in memory");
            Arc::new(MemoryVectorStore::new())
        }
    };
    let ingestion = Arc::new(IngestionBuffer::new(store, config.batch.duration_secs));
    let service = IngestionService::start(ingestion.clone(), config.batch.duration_secs);

    let listen: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("invalid listen address '{}'", config.server.listen))?;
    let app = router(AppState {
        config: config.clone(),
        boundary,
        ingestion,
    });

    info!(%listen, "starting streamscribe server");
    let listener = TcpListener::bind(listen)
        .await
        .context("failed to bind tcp listener")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited")?;

    // Drain whatever the last batch window collected before exiting.
    service.stop().await;
    Ok(())
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
